use gtmpl::Value;
use std::collections::HashMap;

/// The rendered fragments of one page, as seen by the page template.
pub struct Fragments<'a> {
    pub content: &'a str,
    pub sidebar: &'a str,
}

impl From<&Fragments<'_>> for Value {
    fn from(f: &Fragments<'_>) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("content".to_owned(), Value::String(f.content.to_owned()));
        m.insert("sidebar".to_owned(), Value::String(f.sidebar.to_owned()));
        Value::Object(m)
    }
}
