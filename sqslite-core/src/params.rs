//! Request parameter sets

use std::collections::BTreeMap;

/// Ordered request parameters
///
/// Keys iterate in lexicographic order, which is also the order the signer
/// canonicalizes them in. A key may carry several values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<String, Vec<String>>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous values
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), vec![value.into()]);
        self
    }

    /// Append a value to a parameter
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.entry(key.into()).or_default().push(value.into());
        self
    }

    /// Emit `prefix.1`, `prefix.2`, ... in the order the values are given
    pub fn set_indexed<I, V>(&mut self, prefix: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        for (i, value) in values.into_iter().enumerate() {
            self.set(format!("{}.{}", prefix, i + 1), value);
        }
        self
    }

    /// First value of a parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Collect the values of `prefix.1`, `prefix.2`, ... until the first gap
    pub fn get_indexed(&self, prefix: &str) -> Vec<&str> {
        (1..)
            .map_while(|i| self.get(&format!("{}.{}", prefix, i)))
            .collect()
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every `(key, value)` pair, keys in lexicographic order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// `application/x-www-form-urlencoded` serialization
    pub fn to_form_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs())
            .finish()
    }

    /// Parse a query string or form body
    pub fn from_form(input: &[u8]) -> Self {
        form_urlencoded::parse(input).into_owned().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.add(k, v);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_params_follow_caller_order() {
        let mut params = Params::new();
        params.set_indexed("AttributeName", ["VisibilityTimeout", "All", "QueueArn"]);

        assert_eq!(params.get("AttributeName.1"), Some("VisibilityTimeout"));
        assert_eq!(params.get("AttributeName.2"), Some("All"));
        assert_eq!(params.get("AttributeName.3"), Some("QueueArn"));
        assert!(!params.contains_key("AttributeName.0"));
        assert!(!params.contains_key("AttributeName.4"));
        assert_eq!(
            params.get_indexed("AttributeName"),
            vec!["VisibilityTimeout", "All", "QueueArn"]
        );
    }

    #[test]
    fn test_indexed_params_have_no_gaps_past_nine() {
        let mut params = Params::new();
        params.set_indexed("ActionName", (0..12).map(|i| format!("a{}", i)));

        let collected = params.get_indexed("ActionName");
        assert_eq!(collected.len(), 12);
        assert_eq!(collected[9], "a9");
        assert_eq!(collected[11], "a11");
    }

    #[test]
    fn test_set_replaces_and_add_appends() {
        let mut params = Params::new();
        params.set("QueueName", "a").set("QueueName", "b");
        assert_eq!(params.get_all("QueueName"), ["b".to_string()]);

        params.add("QueueName", "c");
        assert_eq!(params.get_all("QueueName").len(), 2);
        assert_eq!(params.get("QueueName"), Some("b"));
    }

    #[test]
    fn test_pairs_are_sorted_by_key() {
        let params: Params = [("Version", "1"), ("Action", "ListQueues"), ("B", "x")]
            .into_iter()
            .collect();

        let keys: Vec<&str> = params.pairs().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Action", "B", "Version"]);
    }

    #[test]
    fn test_form_encoding() {
        let mut params = Params::new();
        params.set("MessageBody", "hello world & more");
        params.set("Action", "SendMessage");

        let encoded = params.to_form_string();
        assert_eq!(encoded, "Action=SendMessage&MessageBody=hello+world+%26+more");

        let decoded = Params::from_form(encoded.as_bytes());
        assert_eq!(decoded, params);
    }
}
