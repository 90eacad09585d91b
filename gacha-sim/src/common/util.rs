/// Split a comma-separated flag value, dropping blanks.
pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse `#rgb` or `#rrggbb` into components.
pub fn hex_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut digits = hex.chars().map(|c| c.to_digit(16));
            let mut next = || -> Option<u8> {
                let d = u8::try_from(digits.next()??).ok()?;
                Some(d * 17)
            };
            Some((next()?, next()?, next()?))
        }
        6 => Some((
            channel(hex.get(0..2)?)?,
            channel(hex.get(2..4)?)?,
            channel(hex.get(4..6)?)?,
        )),
        _ => None,
    }
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" standard, ,generous,  predatory ");
        assert_eq!(parts, vec!["standard", "generous", "predatory"]);
    }

    #[test]
    fn hex_rgb_accepts_short_and_long_forms() {
        assert_eq!(hex_rgb("#ff9800"), Some((255, 152, 0)));
        assert_eq!(hex_rgb("#555"), Some((85, 85, 85)));
        assert_eq!(hex_rgb("ff9800"), None);
        assert_eq!(hex_rgb("#12345"), None);
        assert_eq!(hex_rgb("#gg0000"), None);
    }

    #[test]
    fn csv_field_quotes_when_needed() {
        assert_eq!(csv_field("Epic"), "Epic");
        assert_eq!(csv_field("Ultra, Rare"), "\"Ultra, Rare\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
