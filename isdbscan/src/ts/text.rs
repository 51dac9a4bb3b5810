//! Best-effort ARIB STD-B24 8-unit text decoding.
//!
//! SI strings default to the two-byte JIS X 0208 kanji set in GL, with
//! escape sequences switching to the single-byte alphanumeric and kana
//! sets. That subset covers service and network names as actually
//! broadcast; DRCS glyphs and the less common designations are skipped.
//! Decoded text is normalized so full-width alphanumerics come out
//! half-width, matching what downstream channel-list consumers expect.

use encoding_rs::EUC_JP;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Charset {
    Kanji,
    Alphanumeric,
    Hiragana,
    Katakana,
}

/// Decode an ARIB 8-unit string and normalize it.
pub fn decode_arib_text(bytes: &[u8]) -> String {
    normalize_text(&decode_raw(bytes))
}

fn decode_raw(bytes: &[u8]) -> String {
    let mut out = String::new();
    // Pending two-byte characters, decoded in one EUC-JP batch.
    let mut euc: Vec<u8> = Vec::new();
    let mut g0 = Charset::Kanji;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            0x1B => {
                flush_euc(&mut euc, &mut out);
                i += consume_escape(&bytes[i..], &mut g0);
            }
            0x20 => {
                flush_euc(&mut euc, &mut out);
                out.push(' ');
                i += 1;
            }
            0x21..=0x7E => match g0 {
                Charset::Kanji => {
                    if i + 1 < bytes.len() && (0x21..=0x7E).contains(&bytes[i + 1]) {
                        euc.push(b | 0x80);
                        euc.push(bytes[i + 1] | 0x80);
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                Charset::Alphanumeric => {
                    flush_euc(&mut euc, &mut out);
                    out.push(b as char);
                    i += 1;
                }
                Charset::Hiragana => {
                    flush_euc(&mut euc, &mut out);
                    if let Some(c) = char::from_u32(0x3041 + u32::from(b) - 0x21) {
                        if (0x21..=0x73).contains(&b) {
                            out.push(c);
                        }
                    }
                    i += 1;
                }
                Charset::Katakana => {
                    flush_euc(&mut euc, &mut out);
                    if let Some(c) = char::from_u32(0x30A1 + u32::from(b) - 0x21) {
                        if (0x21..=0x76).contains(&b) {
                            out.push(c);
                        }
                    }
                    i += 1;
                }
            },
            0xA1..=0xFE => {
                // GR two-byte character, already in EUC-JP range.
                if i + 1 < bytes.len() && bytes[i + 1] >= 0xA1 {
                    euc.push(b);
                    euc.push(bytes[i + 1]);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            // Control codes, shifts and DRCS invocations carry no text.
            _ => {
                flush_euc(&mut euc, &mut out);
                i += 1;
            }
        }
    }

    flush_euc(&mut euc, &mut out);
    out
}

fn flush_euc(euc: &mut Vec<u8>, out: &mut String) {
    if euc.is_empty() {
        return;
    }
    let (decoded, _, _) = EUC_JP.decode(euc);
    for c in decoded.chars().filter(|&c| c != char::REPLACEMENT_CHARACTER) {
        out.push(c);
    }
    euc.clear();
}

/// Consume an escape sequence, updating the G0 designation. Returns how
/// many bytes were consumed.
fn consume_escape(bytes: &[u8], g0: &mut Charset) -> usize {
    match bytes.get(1) {
        // Single-byte set into G0
        Some(0x28) => {
            if let Some(&final_byte) = bytes.get(2) {
                *g0 = match final_byte {
                    0x30 => Charset::Hiragana,
                    0x31 => Charset::Katakana,
                    _ => Charset::Alphanumeric,
                };
            }
            3
        }
        // Two-byte set into G0, with or without the extra 0x28
        Some(0x24) => match bytes.get(2) {
            Some(0x28) => {
                *g0 = Charset::Kanji;
                4
            }
            Some(_) => {
                *g0 = Charset::Kanji;
                3
            }
            None => 2,
        },
        Some(_) => 2,
        None => 1,
    }
}

/// Normalize decoded text: full-width alphanumerics and most symbols to
/// half-width, with the handful of opposite-direction replacements channel
/// lists conventionally use (wave dash to full-width tilde included).
pub fn normalize_text(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '０'..='９' => from_offset(c, '０', '0'),
            'Ａ'..='Ｚ' => from_offset(c, 'Ａ', 'A'),
            'ａ'..='ｚ' => from_offset(c, 'ａ', 'a'),
            '　' => ' ',
            '＂' => '"',
            '＃' => '#',
            '＄' => '$',
            '％' => '%',
            '＆' => '&',
            '＇' => '\'',
            '（' => '(',
            '）' => ')',
            '＋' => '+',
            '，' => ',',
            '－' => '-',
            '．' => '.',
            '／' => '/',
            '：' => ':',
            '；' => ';',
            '＜' => '<',
            '＝' => '=',
            '＞' => '>',
            '［' => '[',
            '＼' => '\\',
            '］' => ']',
            '＾' => '^',
            '＿' => '_',
            '｀' => '`',
            '｛' => '{',
            '｜' => '|',
            '｝' => '}',
            '!' => '！',
            '?' => '？',
            '*' => '＊',
            '~' => '～',
            '@' => '＠',
            '♯' => '#',
            '〜' => '～',
            other => other,
        })
        .collect()
}

fn from_offset(c: char, full_start: char, half_start: char) -> char {
    char::from_u32(c as u32 - full_start as u32 + half_start as u32).unwrap_or(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kanji_pairs() {
        // 朝日: JIS X 0208 0x442B / 0x467C in GL
        assert_eq!(decode_arib_text(&[0x44, 0x2B, 0x46, 0x7C]), "朝日");
    }

    #[test]
    fn test_fullwidth_alnum_normalized() {
        // ＢＳ in the kanji set (row 3) comes out half-width
        assert_eq!(decode_arib_text(&[0x23, 0x42, 0x23, 0x53]), "BS");
    }

    #[test]
    fn test_escape_to_alphanumeric() {
        let bytes = [0x1B, 0x28, 0x4A, b'N', b'H', b'K'];
        assert_eq!(decode_arib_text(&bytes), "NHK");
    }

    #[test]
    fn test_escape_to_katakana() {
        // テレビ: katakana cells 0x46, 0x6C, 0x53 with a voiced 0x53+゛...
        // keep it simple: テレヒ cells 0x46 0x6C 0x52
        let bytes = [0x1B, 0x28, 0x31, 0x46, 0x6C, 0x52];
        assert_eq!(decode_arib_text(&bytes), "テレヒ");
    }

    #[test]
    fn test_gr_bytes_decode_as_euc() {
        // EUC-JP for 放送
        assert_eq!(decode_arib_text(&[0xCA, 0xFC, 0xC1, 0xF7]), "放送");
    }

    #[test]
    fn test_normalize_replacements() {
        assert_eq!(normalize_text("ＴＢＳ！？　＊〜♯"), "TBS！？ ＊～#");
        assert_eq!(normalize_text("test!"), "test！");
    }
}
