use std::{borrow::Cow, fmt, str};

/// Parsed graph reference. A graph reference is a string of the form `graph@variant`.
#[derive(Clone, Hash, PartialEq, Eq, Debug)]
pub struct GraphRef {
    graph_id: String,
    variant: Option<String>,
}

impl GraphRef {
    #[must_use]
    pub fn new(graph_id: impl Into<String>, variant: Option<String>) -> Self {
        Self {
            graph_id: graph_id.into(),
            variant,
        }
    }

    #[must_use]
    pub fn graph_id(&self) -> &str {
        &self.graph_id
    }

    #[must_use]
    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }
}

impl str::FromStr for GraphRef {
    type Err = Cow<'static, str>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (graph_id, variant) = match s.split_once('@') {
            Some((graph_id, variant)) => (graph_id, Some(variant)),
            None => (s, None),
        };

        if graph_id.is_empty() {
            return Err(Cow::Borrowed("The graph id is missing."));
        }

        if graph_id.contains('/') {
            let did_you_mean = 'split: {
                let Some((_, graph_id)) = graph_id.split_once('/') else {
                    break 'split String::new();
                };

                if graph_id.is_empty() {
                    break 'split String::new();
                }

                let variant = variant.map(|v| format!("@{v}")).unwrap_or_default();

                format!(" Did you mean: \"{graph_id}{variant}\"")
            };

            return Err(Cow::Owned(format!(
                "Graph ref should not contain an account name.{did_you_mean}"
            )));
        }

        Ok(Self {
            graph_id: graph_id.to_owned(),
            variant: variant.filter(|v| !v.is_empty()).map(String::from),
        })
    }
}

impl fmt::Display for GraphRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.graph_id)?;

        if let Some(variant) = &self.variant {
            f.write_str("@")?;
            f.write_str(variant)?;
        }

        Ok(())
    }
}
