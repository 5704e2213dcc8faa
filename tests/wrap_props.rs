use gotab::emit::wrap_comment;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn lines_fit_and_keep_every_word(words in prop::collection::vec("[a-zA-Z.]{1,30}", 0..40), width in 20usize..100) {
        let text = words.join(" ");
        let wrapped = wrap_comment(&text, width);

        let mut seen = Vec::new();
        for line in wrapped.lines() {
            prop_assert!(line.starts_with("//"), "line without marker: {line:?}");
            let line_words: Vec<&str> = line[2..].split_whitespace().collect();
            prop_assert!(
                line.len() <= width || line_words.len() == 1,
                "overlong line {line:?} for width {width}"
            );
            seen.extend(line_words.into_iter().map(str::to_owned));
        }
        prop_assert_eq!(seen, words);
    }
}
