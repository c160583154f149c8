use solopipe_endpoint::{EndpointError, PipeEndpoint};
use solopipe_wire::WireBuf;
use tracing::{debug, info};

use crate::cmd::ListenArgs;
use crate::exit::{endpoint_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

const READ_CHUNK_SIZE: usize = 8 * 1024;

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut pipe =
        PipeEndpoint::serve(&args.name).map_err(|err| endpoint_error("listen failed", err))?;
    if let Some(label) = &args.label {
        pipe.set_label(label.clone());
    }
    info!(name = %args.name, "peer connected");

    let mut printed = 0usize;
    loop {
        // Each message arrives as a 4-byte length followed by the payload;
        // assembling the payload is the receiver's job.
        let len = match pipe.read_u32() {
            Ok(len) => len as usize,
            // The peer hanging up between messages is the normal way out.
            Err(EndpointError::Disconnected { transferred: 0, .. }) => break,
            Err(err) => return Err(endpoint_error("receive failed", err)),
        };

        let mut msg = WireBuf::with_capacity(len);
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let mut remaining = len;
        while remaining > 0 {
            let take = remaining.min(READ_CHUNK_SIZE);
            pipe.read_exact(&mut chunk[..take])
                .map_err(|err| endpoint_error("receive failed", err))?;
            msg.write(&chunk[..take]);
            remaining -= take;
        }

        debug!(seq = printed, size = len, "message received");
        print_message(printed, msg.as_slice(), format);
        printed += 1;

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    Ok(SUCCESS)
}
