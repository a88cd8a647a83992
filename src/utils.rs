use indicatif::{ProgressBar, ProgressStyle};

pub fn progress_bar(len: u64) -> ProgressBar {
    ProgressBar::new(len).with_style(
        ProgressStyle::with_template("[{elapsed_precise}] {human_pos}/{human_len} {percent}% ({per_sec})")
            .expect("hardcoded"),
    )
}

pub fn title_case(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut output = String::with_capacity(lower.len());
    let mut capitalize = true;
    let mut letters = 0;
    for c in lower.chars() {
        if capitalize && c.is_alphabetic() {
            output.extend(c.to_uppercase());
            capitalize = false;
        } else {
            output.push(c);
        }
        if c.is_alphabetic() {
            letters += 1;
        }

        if c == '\'' || c == '-' {
            capitalize = true;
        } else if letters == 2 && lower.starts_with("mc") && lower.chars().count() > 3 {
            capitalize = true;
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("BROADWAY"), "Broadway");
        assert_eq!(title_case("broadway"), "Broadway");
        assert_eq!(title_case("MCBAINE"), "McBaine");
        assert_eq!(title_case("McBaine"), "McBaine");
        assert_eq!(title_case("O'NEIL"), "O'Neil");
        assert_eq!(title_case("MC"), "Mc");
        assert_eq!(title_case("STADIUM,"), "Stadium,");
    }
}
