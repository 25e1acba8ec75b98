//! Text and binary renderings of a [`CompiledImage`] for loaders.
//!
//! Writers target `core::fmt::Write` so the caller decides where the text
//! goes. The hex dump always covers the full program memory and can be read
//! back with [`parse_hex_dump`].

use core::fmt::Write;

use heapless::{String, Vec};
use thiserror_no_std::Error;

use crate::assembler::CompiledImage;
use crate::parser::Segment;
use crate::{ENGINE_COUNT, IMAGE_BYTES, NAME_CAP, PAGE_BYTES, ProgramWord};

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("formatter error")]
    Format,
    #[error("{count} segments, the chip only has {max} engines")]
    TooManySegments { count: usize, max: usize },
    #[error("malformed hex dump at line {line}")]
    InvalidHexDump { line: usize },
    #[error("loader frame error: {0}")]
    Postcard(#[from] postcard::Error),
}

impl From<core::fmt::Error> for ArtifactError {
    fn from(_: core::fmt::Error) -> Self {
        ArtifactError::Format
    }
}

const DUMP_LINES: usize = IMAGE_BYTES / PAGE_BYTES;

fn check_engines(image: &CompiledImage) -> Result<(), ArtifactError> {
    if image.segments.len() > ENGINE_COUNT {
        return Err(ArtifactError::TooManySegments {
            count: image.segments.len(),
            max: ENGINE_COUNT,
        });
    }
    Ok(())
}

/// `00 01 00 02 ...` lines of sixteen bytes for the whole program memory,
/// then one `@ <addr> <name>` line per segment.
pub fn write_hex_dump<W: Write>(out: &mut W, image: &CompiledImage) -> Result<(), ArtifactError> {
    for line in 0..DUMP_LINES {
        for column in 0..PAGE_BYTES {
            let byte = image
                .bytes
                .get(line * PAGE_BYTES + column)
                .copied()
                .unwrap_or(0);
            if column > 0 {
                out.write_char(' ')?;
            }
            write!(out, "{byte:02X}")?;
        }
        out.write_char('\n')?;
    }
    for segment in image.segments.iter() {
        writeln!(out, "@ {:02X} {}", segment.address, segment.name)?;
    }
    Ok(())
}

/// Read a hex dump back. Trailing all zero pages are dropped again, they
/// are indistinguishable from the fill [`write_hex_dump`] adds.
pub fn parse_hex_dump(text: &str) -> Result<CompiledImage, ArtifactError> {
    let mut image = CompiledImage::default();
    for (index, line) in text.lines().enumerate() {
        let invalid = || ArtifactError::InvalidHexDump { line: index + 1 };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(marker) = line.strip_prefix('@') {
            let mut fields = marker.split_whitespace();
            let (Some(address), Some(name), None) = (fields.next(), fields.next(), fields.next()) else {
                return Err(invalid());
            };
            let address = ProgramWord::from_str_radix(address, 16).map_err(|_| invalid())?;
            let mut segment_name: String<NAME_CAP> = String::new();
            segment_name
                .push_str(name)
                .map_err(|_| invalid())?;
            image
                .segments
                .push(Segment {
                    name: segment_name,
                    address,
                })
                .map_err(|_| invalid())?;
            continue;
        }

        if !image.segments.is_empty() {
            // Bytes after the segment table.
            return Err(invalid());
        }
        for field in line.split_whitespace() {
            let byte = u8::from_str_radix(field, 16)
                .map_err(|_| invalid())?;
            image
                .bytes
                .push(byte)
                .map_err(|_| invalid())?;
        }
    }

    while image.bytes.len() >= PAGE_BYTES
        && image
            .bytes
            .iter()
            .rev()
            .take(PAGE_BYTES)
            .all(|byte| *byte == 0)
    {
        image.bytes.truncate(image.bytes.len() - PAGE_BYTES);
    }
    Ok(image)
}

/// C translation unit with the image as `name[]` and the segment starts as
/// `name_addr[]`. `include_header` adds `#include <name.h>` in front, leave
/// it out when appending to an existing file.
pub fn write_c_source<W: Write>(
    out: &mut W,
    name: &str,
    image: &CompiledImage,
    include_header: bool,
) -> Result<(), ArtifactError> {
    check_engines(image)?;
    if include_header {
        writeln!(out, "#include <{name}.h>")?;
    }
    writeln!(out, "const uint8_t {name}[]={{")?;
    for page in image.bytes.chunks(PAGE_BYTES) {
        for byte in page {
            write!(out, "0x{byte:02X},")?;
        }
        out.write_char('\n')?;
    }
    writeln!(out, "}};")?;

    write!(out, "const uint8_t {name}_addr[]={{")?;
    for (index, segment) in image.segments.iter().enumerate() {
        if index > 0 {
            out.write_char(',')?;
        }
        write!(out, "0x{:02X}", segment.address)?;
    }
    writeln!(out, "}};")?;
    Ok(())
}

struct Upper<'a>(&'a str);

impl core::fmt::Display for Upper<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0
            .chars()
            .try_for_each(|c| f.write_char(c.to_ascii_uppercase()))
    }
}

/// Declarations matching [`write_c_source`]. `include_guard` wraps them in
/// an include guard and pulls in `sys.h` for the integer types.
pub fn write_c_header<W: Write>(
    out: &mut W,
    name: &str,
    image: &CompiledImage,
    include_guard: bool,
) -> Result<(), ArtifactError> {
    check_engines(image)?;
    let guard = Upper(name);
    if include_guard {
        writeln!(out, "#ifndef _{guard}_H_")?;
        writeln!(out, "#define _{guard}_H_")?;
        writeln!(out, "#include <sys.h>")?;
    }
    writeln!(out, "extern const uint8_t {name}[{}];", image.bytes.len())?;
    writeln!(out, "extern const uint8_t {name}_addr[{ENGINE_COUNT}];")?;
    if include_guard {
        writeln!(out, "#endif /* _{guard}_H_ */")?;
    }
    Ok(())
}

/// Largest COBS frame a [`CompiledImage`] can need.
pub const FRAME_CAP: usize = 2048;

pub type Frame = Vec<u8, FRAME_CAP>;

/// Serialize the image with postcard and COBS frame it for a serial link.
pub fn write_frame(image: &CompiledImage) -> Result<Frame, ArtifactError> {
    let mut buffer = [0u8; FRAME_CAP];
    let used = postcard::to_slice_cobs(image, &mut buffer)?;
    Vec::from_slice(used).map_err(|_| ArtifactError::Format)
}

/// Decode a frame produced by [`write_frame`]. The buffer is decoded in
/// place.
pub fn read_frame(frame: &mut [u8]) -> Result<CompiledImage, ArtifactError> {
    Ok(postcard::from_bytes_cobs(frame)?)
}
