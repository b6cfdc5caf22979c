use std::fmt::Write;

/// Renders `data` as offset, 16 hex bytes and the printable ASCII column.
pub fn format_hexdump(data: &[u8]) -> String {
    let mut result = String::new();

    for (i, chunk) in data.chunks(16).enumerate() {
        let _ = write!(result, "0x{:04x}:  ", i * 16);

        for (j, byte) in chunk.iter().enumerate() {
            let _ = write!(result, "{:02x}", byte);
            // Space between bytes, an extra one after the eighth
            if j < chunk.len() - 1 {
                result.push(' ');
                if j == 7 {
                    result.push(' ');
                }
            }
        }

        // Pad short lines so the ASCII column lines up
        if chunk.len() < 16 {
            let padding = (16 - chunk.len()) * 3 + usize::from(chunk.len() <= 8);
            result.push_str(&" ".repeat(padding));
        }

        result.push_str("  ");
        result.extend(chunk.iter().map(|&byte| {
            if byte.is_ascii_graphic() {
                byte as char
            } else {
                '.'
            }
        }));
        result.push('\n');
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_line() {
        let data: Vec<u8> = (0x41..0x51).collect();
        assert_eq!(
            format_hexdump(&data),
            "0x0000:  41 42 43 44 45 46 47 48  49 4a 4b 4c 4d 4e 4f 50  ABCDEFGHIJKLMNOP\n"
        );
    }

    #[test]
    fn short_line_aligns_ascii_column() {
        let full = format_hexdump(&[0x58; 16]);
        let short = format_hexdump(&[0x00, 0x58]);
        let ascii_col = |s: &str| s.find("  X").or_else(|| s.find("  .")).unwrap();
        assert_eq!(ascii_col(&short), full.rfind("  X").unwrap());
        assert!(short.ends_with("  .X\n"));
    }

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(format_hexdump(&[]), "");
    }
}
