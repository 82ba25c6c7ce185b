use hermes_core::Result;
use serde::{de::DeserializeOwned, Serialize};

/// Splits `---\n<yaml>\n---\n<body>` into (frontmatter, body). If the file
/// has no leading `---` fence, returns `None` for the frontmatter and the
/// whole content as body — callers fall back to defaults.
pub fn split<T: DeserializeOwned + Default>(content: &str) -> (T, &str) {
    let Some(rest) = content.strip_prefix("---\n") else {
        return (T::default(), content);
    };
    let Some(end) = rest.find("\n---\n") else {
        return (T::default(), content);
    };
    let yaml = &rest[..end];
    let body = &rest[end + 5..];
    match serde_yaml::from_str(yaml) {
        Ok(v) => (v, body),
        Err(_) => (T::default(), content),
    }
}

pub fn join<T: Serialize>(frontmatter: &T, body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(frontmatter)?;
    Ok(format!("---\n{yaml}---\n{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Meta {
        #[serde(default)]
        title: String,
    }

    #[test]
    fn round_trips_frontmatter_and_body() {
        let joined = join(&Meta { title: "Hello".into() }, "body text\n").unwrap();
        let (meta, body): (Meta, &str) = split(&joined);
        assert_eq!(meta.title, "Hello");
        assert_eq!(body, "body text\n");
    }

    #[test]
    fn missing_frontmatter_defaults_and_keeps_body() {
        let (meta, body): (Meta, &str) = split("no frontmatter here");
        assert_eq!(meta, Meta::default());
        assert_eq!(body, "no frontmatter here");
    }
}
