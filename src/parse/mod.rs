//! Recursive-descent parser over the nested chunk tree.
//!
//! Every scope is a bounded loop: while the cursor is before the enclosing
//! chunk's end offset, read a child header, dispatch on its id, then realign
//! to the child's declared end. Unrecognized ids are skipped, never errors.
//! A child that claims to extend past its parent abandons the scope at the
//! parent's declared end, so corrupt sizes cannot cause unbounded iteration.

/// Parser state threaded through handlers.
pub mod context;
/// Editor section: objects, meshes, materials.
mod editor;
/// Keyframer section: node hierarchy and animation tracks.
mod keyframer;

use rootcause::Report;
use thiserror::Error;
use tracing::{debug, warn};

pub use context::ParseContext;

use crate::chunk::{ChunkHeader, ChunkId, ChunkReader, HEADER_SIZE};
use crate::options::LoadOptions;
use crate::scene::Scene;

/// Structural parse failures. Any of these aborts the whole load.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("structural chunk error: {0}")]
    Chunk(String),
    #[error("not a chunked scene container (leading id 0x{0:04X})")]
    NotAScene(u16),
}

type PError = Report<ParseError>;
type PResult = Result<(), PError>;

fn chunk_err<E: std::fmt::Display>(e: E) -> Report<ParseError> {
    Report::new(ParseError::Chunk(format!("{e}")))
}

/// Walk the children of one scope, dispatching each header to `dispatch` and
/// realigning to the child's declared end afterwards. The loop is strictly
/// bounded by `scope_end`.
fn scan_scope<F>(reader: &mut ChunkReader<'_>, scope_end: usize, mut dispatch: F) -> PResult
where
    F: FnMut(&mut ChunkReader<'_>, ChunkHeader) -> PResult,
{
    while reader.pos() < scope_end {
        if scope_end - reader.pos() < HEADER_SIZE {
            warn!(
                at = reader.pos(),
                scope_end, "trailing bytes too short for a chunk header, skipping"
            );
            break;
        }
        let header = reader.read_header().map_err(chunk_err)?;
        if header.end() > scope_end {
            warn!(
                id = format_args!("0x{:04X}", header.id),
                start = header.start,
                end = header.end(),
                scope_end,
                "child chunk overruns its container, abandoning scope"
            );
            break;
        }
        dispatch(reader, header)?;
        // Realign even if the handler under-read its payload.
        reader.skip_to(header.end());
    }
    reader.skip_to(scope_end);
    Ok(())
}

/// Parse one in-memory container into a raw (pre-bake) scene.
///
/// Hierarchy resolution, transform baking, and normal synthesis are separate
/// passes run by the load entry points; this only consumes chunks.
pub fn parse_scene<'a>(
    data: &[u8],
    options: &'a LoadOptions,
    progress: Option<&'a mut dyn FnMut(&str)>,
) -> Result<Scene, Report<ParseError>> {
    let mut reader = ChunkReader::new(data, options.up_axis);
    let main = reader.read_header().map_err(chunk_err)?;
    if ChunkId::from_u16(main.id) != ChunkId::Main {
        return Err(Report::new(ParseError::NotAScene(main.id)));
    }

    let mut scope_end = main.end();
    if scope_end > data.len() {
        warn!(
            declared = scope_end,
            have = data.len(),
            "container declares more data than the stream holds, clamping"
        );
        scope_end = data.len();
    }

    let mut cx = ParseContext::new(options, progress);
    scan_scope(&mut reader, scope_end, |r, hdr| {
        match ChunkId::from_u16(hdr.id) {
            ChunkId::Editor => {
                cx.notify("reading editor section");
                editor::parse_editor(r, &mut cx, hdr.end())
            }
            ChunkId::Keyframer => {
                cx.notify("reading keyframer section");
                keyframer::parse_keyframer(r, &mut cx, hdr.end())
            }
            other => {
                debug!(?other, "skipping unhandled top-level chunk");
                Ok(())
            }
        }
    })?;

    let scene = cx.builder.finish();
    warn_missing_materials(&scene);
    Ok(scene)
}

/// A mesh referencing a material the file never defined is kept, but the
/// dangling reference is worth a diagnostic.
fn warn_missing_materials(scene: &Scene) {
    for object in &scene.objects {
        for geometry in &object.geometries {
            for mesh in &geometry.meshes {
                if !mesh.material.is_empty() && scene.find_material(&mesh.material).is_none() {
                    warn!(
                        object = %object.name,
                        material = %mesh.material,
                        "mesh references a material the file does not define"
                    );
                }
            }
        }
    }
}
