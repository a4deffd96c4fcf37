//! ESC/POS control sequence stripper
//!
//! Walks a raw print stream and keeps only text bytes. Commands are skipped
//! using their declared lengths so that parameter bytes and image payloads
//! never leak into the text. Line breaks (CR, LF, CR LF, FF) become `\n`.

use tracing::instrument;

const NUL: u8 = 0x00;
const HT: u8 = 0x09;
const LF: u8 = 0x0A;
const FF: u8 = 0x0C;
const CR: u8 = 0x0D;
const DLE: u8 = 0x10;
const ESC: u8 = 0x1B;
const FS: u8 = 0x1C;
const GS: u8 = 0x1D;
const DEL: u8 = 0x7F;

/// Strip ESC/POS, PJL UEL and other C0 control sequences from a print stream
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn strip_control_sequences(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let rest = &bytes[i..];
        match rest[0] {
            ESC => i += esc_len(rest),
            GS => i += gs_len(rest),
            FS => i += fs_len(rest),
            // DLE EOT n / DLE ENQ n: real-time status requests
            DLE => i += 3usize.min(rest.len()),
            LF | FF => {
                out.push(b'\n');
                i += 1;
            }
            CR => {
                out.push(b'\n');
                // CR LF counts as a single break
                i += if rest.get(1) == Some(&LF) { 2 } else { 1 };
            }
            HT => {
                out.push(b' ');
                i += 1;
            }
            b if b < 0x20 || b == DEL => i += 1,
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    out
}

/// Length of a little-endian u16 parameter pair
#[inline]
fn le16(lo: Option<&u8>, hi: Option<&u8>) -> usize {
    usize::from(*lo.unwrap_or(&0)) | (usize::from(*hi.unwrap_or(&0)) << 8)
}

/// Consume up to and including the next byte equal to `terminator`
#[inline]
fn until(rest: &[u8], from: usize, terminator: u8) -> usize {
    rest.iter()
        .skip(from)
        .position(|&b| b == terminator)
        .map_or(rest.len(), |p| from + p + 1)
}

/// Total length of an `ESC x ...` sequence, clamped to the buffer
fn esc_len(rest: &[u8]) -> usize {
    let Some(&cmd) = rest.get(1) else {
        return rest.len();
    };

    let len = match cmd {
        // ESC @ (init), ESC 2 (default spacing), ESC < (return home), ESC S / ESC L (modes)
        b'@' | b'2' | b'<' | b'S' | b'L' => 2,
        // Single parameter commands
        b'a' | b'E' | b'!' | b'-' | b'd' | b't' | b'J' | b'3' | b'M' | b'G' | b'R' | b'{'
        | b'V' | b' ' | b'r' | b'U' | b'e' | b'T' => 3,
        // ESC $ nL nH / ESC \ nL nH (positioning)
        b'$' | b'\\' => 4,
        // ESC c 3 n / ESC c 4 n / ESC c 5 n
        b'c' => 4,
        // ESC p m t1 t2 (drawer pulse)
        b'p' => 5,
        // ESC * m nL nH d1..dk (bit image)
        b'*' => {
            let m = rest.get(2).copied().unwrap_or(0);
            let columns = le16(rest.get(3), rest.get(4));
            let per_column = if m == 32 || m == 33 { 3 } else { 1 };
            5 + columns * per_column
        }
        // ESC D n1 .. nk NUL (tab stops)
        b'D' => until(rest, 2, NUL),
        // ESC %-12345X (PJL universal exit language)
        b'%' => until(rest, 2, b'X').min(10),
        _ => 2,
    };

    len.min(rest.len())
}

/// Total length of a `GS x ...` sequence, clamped to the buffer
fn gs_len(rest: &[u8]) -> usize {
    let Some(&cmd) = rest.get(1) else {
        return rest.len();
    };

    let len = match cmd {
        b':' => 2,
        b'!' | b'B' | b'H' | b'h' | b'w' | b'f' | b'a' | b'I' | b'r' | b'b' | b'/' => 3,
        // GS V m [n] (cut)
        b'V' => match rest.get(2) {
            Some(65 | 66 | 97 | 98 | 103 | 104) => 4,
            _ => 3,
        },
        b'L' | b'W' | b'$' | b'\\' | b'P' => 4,
        // GS k m d1..dk NUL  or  GS k m n d1..dn (barcode)
        b'k' => match rest.get(2) {
            Some(&m) if m <= 6 => until(rest, 3, NUL),
            Some(_) => 4 + usize::from(rest.get(3).copied().unwrap_or(0)),
            None => rest.len(),
        },
        // GS v 0 m xL xH yL yH d1..dk (raster image)
        b'v' => {
            let width = le16(rest.get(4), rest.get(5));
            let height = le16(rest.get(6), rest.get(7));
            8usize.saturating_add(width.saturating_mul(height))
        }
        // GS ( fn pL pH ... (length-prefixed function blocks)
        b'(' => 5 + le16(rest.get(3), rest.get(4)),
        // GS 8 L p1 p2 p3 p4 ... (large graphics data)
        b'8' => {
            let p = |i: usize| usize::from(rest.get(i).copied().unwrap_or(0));
            7usize.saturating_add(p(3) | p(4) << 8 | p(5) << 16 | p(6) << 24)
        }
        // GS * x y d1..d(x*y*8) (downloaded bit image)
        b'*' => {
            let x = usize::from(rest.get(2).copied().unwrap_or(0));
            let y = usize::from(rest.get(3).copied().unwrap_or(0));
            4 + x * y * 8
        }
        _ => 2,
    };

    len.min(rest.len())
}

/// Total length of an `FS x ...` sequence, clamped to the buffer
fn fs_len(rest: &[u8]) -> usize {
    let Some(&cmd) = rest.get(1) else {
        return rest.len();
    };

    let len = match cmd {
        // FS & (kanji mode on), FS . (kanji mode off)
        b'&' | b'.' => 2,
        b'C' | b'!' | b'-' | b'W' => 3,
        b'p' | b'S' => 4,
        _ => 2,
    };

    len.min(rest.len())
}
