use std::fs;
use std::io::Read;

use solopipe_endpoint::PipeEndpoint;
use solopipe_wire::WireBuf;
use tracing::debug;

use crate::cmd::SendArgs;
use crate::exit::{endpoint_error, io_error, CliResult, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;

    let mut pipe =
        PipeEndpoint::connect(&args.name).map_err(|err| endpoint_error("connect failed", err))?;

    let mut msg = WireBuf::with_capacity(payload.len());
    msg.write(&payload);

    for _ in 0..args.repeat {
        pipe.send_buf(&msg)
            .map_err(|err| endpoint_error("send failed", err))?;
    }
    debug!(size = msg.len(), repeat = args.repeat, "message sent");

    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }

    let mut payload = Vec::new();
    std::io::stdin()
        .read_to_end(&mut payload)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(payload)
}
