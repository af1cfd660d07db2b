//! Reconstructs plate text from an unordered bag of character boxes.
//!
//! Characters are scanned top-to-bottom, left-to-right. A new row starts
//! whenever a character's top edge is more than `threshold` pixels away from
//! the top edge of the character scanned just before it. The comparison is
//! pairwise, not against the row's first character, so a row whose
//! characters drift slowly downwards (a skewed plate) stays a single row.

use crate::labels::translate;
use common::detections::CharacterDetection;

/// Default vertical distance (pixels) that separates two text rows
pub const DEFAULT_ROW_THRESHOLD: f32 = 20.0;

/// One line of plate text, ordered left to right
#[derive(Debug, Clone, Default)]
pub struct TextRow<'a> {
    characters: Vec<&'a CharacterDetection>,
}

impl<'a> TextRow<'a> {
    pub fn characters(&self) -> &[&'a CharacterDetection] {
        &self.characters
    }

    pub fn labels(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.characters.iter().map(|&c| c.label.as_str())
    }

    /// Raw labels joined by single spaces
    pub fn english(&self) -> String {
        self.labels().collect::<Vec<_>>().join(" ")
    }

    /// Translated labels joined by single spaces
    pub fn nepali(&self) -> String {
        self.labels().map(translate).collect::<Vec<_>>().join(" ")
    }

    fn sort_left_to_right(&mut self) {
        self.characters.sort_by(|a, b| a.x().total_cmp(&b.x()));
    }
}

/// Group characters into rows ordered top to bottom
pub fn group_rows(characters: &[CharacterDetection], threshold: f32) -> Vec<TextRow<'_>> {
    let mut scan: Vec<&CharacterDetection> = characters.iter().collect();
    scan.sort_by(|a, b| a.y().total_cmp(&b.y()).then(a.x().total_cmp(&b.x())));

    let Some(first) = scan.first() else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    let mut current = TextRow::default();
    let mut previous_y = first.y();

    for character in scan {
        if (character.y() - previous_y).abs() > threshold {
            rows.push(std::mem::take(&mut current));
        }
        current.characters.push(character);
        previous_y = character.y();
    }

    if !current.characters.is_empty() {
        rows.push(current);
    }

    for row in &mut rows {
        row.sort_left_to_right();
    }

    rows
}

/// Render characters as `(english, nepali)` text, one row per line
pub fn reconstruct_text(characters: &[CharacterDetection], threshold: f32) -> (String, String) {
    let rows = group_rows(characters, threshold);

    let english = rows
        .iter()
        .map(TextRow::english)
        .collect::<Vec<_>>()
        .join("\n");
    let nepali = rows
        .iter()
        .map(TextRow::nepali)
        .collect::<Vec<_>>()
        .join("\n");

    (english.trim().to_string(), nepali.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::detections::BoundingBox;

    fn ch(label: &str, x: f32, y: f32) -> CharacterDetection {
        CharacterDetection {
            label: label.to_string(),
            confidence: 0.9,
            bbox: BoundingBox::new(x, y, x + 12.0, y + 18.0),
            plate_origin: (0.0, 0.0),
        }
    }

    #[test]
    fn test_empty_input() {
        let (english, nepali) = reconstruct_text(&[], DEFAULT_ROW_THRESHOLD);
        assert_eq!(english, "");
        assert_eq!(nepali, "");
    }

    #[test]
    fn test_single_character() {
        let (english, nepali) = reconstruct_text(&[ch("KA", 10.0, 10.0)], DEFAULT_ROW_THRESHOLD);
        assert_eq!(english, "KA");
        assert_eq!(nepali, "क");
    }

    #[test]
    fn test_same_row_reordered_by_x() {
        let characters = vec![ch("JA", 50.0, 10.0), ch("KA", 10.0, 12.0)];
        let (english, nepali) = reconstruct_text(&characters, DEFAULT_ROW_THRESHOLD);
        assert_eq!(english, "KA JA");
        assert_eq!(nepali, "क ज");
    }

    #[test]
    fn test_rows_split_on_vertical_gap() {
        let characters = vec![ch("KA", 10.0, 10.0), ch("1", 10.0, 40.0)];
        let (english, nepali) = reconstruct_text(&characters, DEFAULT_ROW_THRESHOLD);
        assert_eq!(english, "KA\n1");
        assert_eq!(nepali, "क\n१");
    }

    #[test]
    fn test_gap_equal_to_threshold_stays_in_row() {
        let characters = vec![ch("KA", 10.0, 10.0), ch("1", 40.0, 30.0)];
        let rows = group_rows(&characters, DEFAULT_ROW_THRESHOLD);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_unknown_label_passes_through() {
        let characters = vec![ch("BA", 10.0, 10.0), ch("GA", 30.0, 10.0)];
        let (english, nepali) = reconstruct_text(&characters, DEFAULT_ROW_THRESHOLD);
        assert_eq!(english, "BA GA");
        assert_eq!(nepali, "बा GA");
    }

    #[test]
    fn test_pairwise_drift_keeps_single_row() {
        // each step is 15px, total drift 60px from the first character
        let characters = vec![
            ch("BA", 0.0, 0.0),
            ch("2", 20.0, 15.0),
            ch("PA", 40.0, 30.0),
            ch("3", 60.0, 45.0),
            ch("4", 80.0, 60.0),
        ];
        let rows = group_rows(&characters, DEFAULT_ROW_THRESHOLD);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].english(), "BA 2 PA 3 4");
    }

    #[test]
    fn test_two_line_plate() {
        // input order is scrambled; rows are top then bottom
        let characters = vec![
            ch("7", 60.0, 82.0),
            ch("PA", 70.0, 20.0),
            ch("1", 20.0, 80.0),
            ch("BA", 10.0, 22.0),
            ch("2", 40.0, 18.0),
            ch("5", 40.0, 85.0),
        ];
        let (english, nepali) = reconstruct_text(&characters, DEFAULT_ROW_THRESHOLD);
        assert_eq!(english, "BA 2 PA\n1 5 7");
        assert_eq!(nepali, "बा २ PA\n१ ५ ७");
    }

    #[test]
    fn test_every_character_lands_in_exactly_one_row() {
        let characters: Vec<_> = (0..12)
            .map(|i| ch("1", (i * 7 % 5) as f32 * 20.0, (i * 13 % 90) as f32))
            .collect();
        let rows = group_rows(&characters, DEFAULT_ROW_THRESHOLD);
        let total: usize = rows.iter().map(|r| r.characters().len()).sum();
        assert_eq!(total, characters.len());

        for row in &rows {
            let xs: Vec<f32> = row.characters().iter().map(|c| c.x()).collect();
            assert!(xs.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_custom_threshold() {
        let characters = vec![ch("KA", 10.0, 10.0), ch("1", 10.0, 40.0)];
        let rows = group_rows(&characters, 50.0);
        assert_eq!(rows.len(), 1);
    }
}
