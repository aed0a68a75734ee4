use crate::cli::{OutputTarget, RenderOptions};
use crate::error::QrgenError;
use crate::symbol::Symbol;
use log::{debug, error, info};
use std::fs::File;
use std::io::Write;

/// Writes `symbol` as text art or PNG bytes to `stdout` or `target`.
pub fn dispatch<W: Write>(
    mut symbol: Symbol,
    options: &RenderOptions,
    target: &OutputTarget,
    stdout: &mut W,
) -> Result<(), QrgenError> {
    if options.text_art {
        debug!("printing text art (invert: {})", options.invert);
        writeln!(stdout, "{}", symbol.to_text_art(options.invert))?;
        stdout.flush()?;
        return Ok(());
    }

    if options.invert {
        symbol.invert_colors();
    }

    let png = symbol.to_png(options.size)?;

    match target {
        OutputTarget::Stdout => {
            debug!("writing {} byte(s) of png to stdout", png.len());
            stdout.write_all(&png)?;
            stdout.flush()?;
        }
        OutputTarget::File(path) => {
            let mut file = File::create(path).map_err(|e| {
                error!("failed to create {}: {}", path.display(), e);
                e
            })?;
            file.write_all(&png)?;
            info!("wrote {} byte(s) to {}", png.len(), path.display());
        }
    }

    Ok(())
}
