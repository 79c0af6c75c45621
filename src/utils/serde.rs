use std::{fmt, hash::Hash, marker::PhantomData};

use indexmap::IndexMap;
use serde::{de::MapAccess, Deserialize, Deserializer};

/// Deserialize a map, rejecting repeated keys instead of keeping the last one
///
/// Use with `#[serde(deserialize_with = "crate::utils::serde::unique_map")]`.
/// Insertion order of the document is preserved.
pub fn unique_map<'de, D, K, V>(deserializer: D) -> Result<IndexMap<K, V>, D::Error>
where
    D: Deserializer<'de>,
    K: Deserialize<'de> + Hash + Eq + fmt::Debug,
    V: Deserialize<'de>,
{
    struct UniqueMapVisitor<K, V>(PhantomData<(K, V)>);

    impl<'de, K, V> serde::de::Visitor<'de> for UniqueMapVisitor<K, V>
    where
        K: Deserialize<'de> + Hash + Eq + fmt::Debug,
        V: Deserialize<'de>,
    {
        type Value = IndexMap<K, V>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map without duplicate keys")
        }

        fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            use serde::de::Error as DeError;

            let mut map = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry::<K, V>()? {
                if map.contains_key(&key) {
                    return Err(DeError::custom(format!("duplicate key {:?}", key)));
                }
                map.insert(key, value);
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(UniqueMapVisitor(PhantomData))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Table {
        #[serde(deserialize_with = "unique_map")]
        entries: IndexMap<String, String>,
    }

    #[test]
    fn keeps_document_order() {
        let t: Table = serde_json::from_str(r#"{"entries":{"b":"1","a":"2"}}"#).unwrap();
        assert_eq!(t.entries.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn rejects_duplicate_keys_json() {
        let res = serde_json::from_str::<Table>(r#"{"entries":{"a":"1","a":"2"}}"#);
        let err = res.unwrap_err().to_string();
        assert!(err.contains("duplicate key"), "{err}");
    }

    #[test]
    fn rejects_duplicate_struct_fields_json() {
        // derived visitors already refuse repeated fields
        let res = serde_json::from_str::<Table>(r#"{"entries":{},"entries":{}}"#);
        assert!(res.is_err());
    }
}
