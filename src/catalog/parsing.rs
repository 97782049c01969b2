use super::error::CatalogError;

/// The raw text of one element set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TleText {
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
}

/// Parses exactly one element set, with or without a name line.
pub fn parse_tle_lines(tle: &str) -> Result<TleText, CatalogError> {
    let lines: Vec<&str> = tle
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    match lines.as_slice() {
        [line1, line2] if is_line(line1, '1') && is_line(line2, '2') => Ok(TleText {
            name: None,
            line1: line1.to_string(),
            line2: line2.to_string(),
        }),
        [name, line1, line2] if is_line(line1, '1') && is_line(line2, '2') => Ok(TleText {
            name: Some(clean_name(name)),
            line1: line1.to_string(),
            line2: line2.to_string(),
        }),
        _ => Err(CatalogError::InvalidTleFormat),
    }
}

/// Splits a multi-satellite file, skipping lines that do not belong to a set.
pub fn parse_multi_tle(content: &str) -> Vec<TleText> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut sets = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let rest = &lines[i..];
        match rest {
            [l1, l2, ..] if is_line(l1, '1') && is_line(l2, '2') => {
                sets.push(TleText {
                    name: None,
                    line1: l1.to_string(),
                    line2: l2.to_string(),
                });
                i += 2;
            }
            [name, l1, l2, ..] if is_line(l1, '1') && is_line(l2, '2') => {
                sets.push(TleText {
                    name: Some(clean_name(name)),
                    line1: l1.to_string(),
                    line2: l2.to_string(),
                });
                i += 3;
            }
            _ => i += 1,
        }
    }
    sets
}

/// Splits the line-1 epoch field (`YYDDD.DDDDDDDD`) into a four digit year
/// and the fractional day of year.
pub fn parse_epoch_field(line1: &str) -> Result<(i32, f64), CatalogError> {
    let field = line1
        .get(18..32)
        .map(str::trim)
        .ok_or_else(|| CatalogError::InvalidEpoch(line1.to_string()))?;
    let invalid = || CatalogError::InvalidEpoch(field.to_string());

    let yy: i32 = field.get(..2).ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
    let day: f64 = field.get(2..).ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
    if !(1.0..367.0).contains(&day) {
        return Err(invalid());
    }

    let year = if yy < 57 { 2000 + yy } else { 1900 + yy };
    Ok((year, day))
}

fn is_line(line: &str, number: char) -> bool {
    let mut chars = line.chars();
    chars.next() == Some(number) && chars.next() == Some(' ')
}

// Celestrak prefixes names with "0 " in three-line format.
fn clean_name(name: &str) -> String {
    name.strip_prefix("0 ").unwrap_or(name).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE1: &str = "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992";
    const LINE2: &str = "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

    #[test]
    fn parses_named_and_unnamed_sets() {
        let named = parse_tle_lines(&format!("ISS (ZARYA)\n{LINE1}\n{LINE2}\n")).unwrap();
        assert_eq!(named.name.as_deref(), Some("ISS (ZARYA)"));

        let bare = parse_tle_lines(&format!("  {LINE1}\n\n{LINE2}")).unwrap();
        assert_eq!(bare.name, None);
        assert_eq!(bare.line2, LINE2);
    }

    #[test]
    fn rejects_wrong_line_count() {
        assert!(matches!(
            parse_tle_lines(LINE1),
            Err(CatalogError::InvalidTleFormat)
        ));
        assert!(parse_tle_lines(&format!("{LINE2}\n{LINE1}")).is_err());
    }

    #[test]
    fn multi_file_skips_noise() {
        let content = format!("# header\n0 ISS\n{LINE1}\n{LINE2}\n{LINE1}\n{LINE2}\ntrailing\n");
        let sets = parse_multi_tle(&content);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].name.as_deref(), Some("ISS"));
        assert_eq!(sets[1].name, None);
    }

    #[test]
    fn epoch_field_pivots_century() {
        assert_eq!(parse_epoch_field(LINE1).unwrap(), (2020, 194.88612269));
        let old = LINE1.replacen("20194", "98194", 1);
        assert_eq!(parse_epoch_field(&old).unwrap().0, 1998);
        assert!(parse_epoch_field("1 25544U").is_err());
    }
}
