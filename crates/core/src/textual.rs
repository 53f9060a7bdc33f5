//! Parsing of the `mongo: <question> | <collection> : <fields>` prompt form

/// A question typed at the prompt, with the optional collection hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextualQuery {
    pub question: String,
    pub collection: Option<String>,
    pub fields: Vec<String>,
}

impl TextualQuery {
    /// Parse prompt input.
    ///
    /// `mongo: which cabin has average age below 21? | titanic : _id, age`
    /// yields the question, the `titanic` collection and its field list.
    /// Input without the `mongo:` marker is taken whole as the question.
    pub fn parse(input: &str) -> Self {
        let Some((_, after_marker)) = input.split_once("mongo:") else {
            return Self {
                question: input.trim().to_string(),
                collection: None,
                fields: Vec::new(),
            };
        };

        let (question, hint) = match after_marker.split_once('|') {
            Some((question, hint)) => (question, Some(hint)),
            None => (after_marker, None),
        };

        let (collection, fields) = match hint.map(|h| h.split_once(':').unwrap_or((h, ""))) {
            Some((name, fields)) => {
                let name = name.trim();
                let fields = fields
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_string)
                    .collect();
                ((!name.is_empty()).then(|| name.to_string()), fields)
            }
            None => (None, Vec::new()),
        };

        Self {
            question: question.trim().to_string(),
            collection,
            fields,
        }
    }
}
