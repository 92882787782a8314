use pagelang::Dictionary;

pub fn t(dictionary: &Dictionary, _: &dyn askama::Values, key: &str) -> askama::Result<String> {
    Ok(dictionary.translate(key))
}
