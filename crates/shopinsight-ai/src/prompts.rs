//! Prompt templates for the analytics pipeline.
//!
//! Templates use `{name}` placeholders; literal braces are written `{{` and
//! `}}`, so JSON examples can appear verbatim in the prompt.

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("template '{template}' is missing variable '{variable}'")]
    MissingVariable { template: String, variable: String },

    #[error("template '{template}' has an unterminated placeholder")]
    Unterminated { template: String },
}

/// Named values substituted into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptVariables(BTreeMap<String, String>);

impl PromptVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// A fixed instruction text with named placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub template: &'static str,
    pub input_variables: &'static [&'static str],
}

impl PromptTemplate {
    pub fn render(&self, variables: &PromptVariables) -> Result<String, PromptError> {
        let mut out = String::with_capacity(self.template.len() + 256);
        let mut chars = self.template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => {
                                return Err(PromptError::Unterminated {
                                    template: self.name.to_string(),
                                })
                            }
                        }
                    }
                    let value = variables.get(name.trim()).ok_or_else(|| {
                        PromptError::MissingVariable {
                            template: self.name.to_string(),
                            variable: name.trim().to_string(),
                        }
                    })?;
                    out.push_str(value);
                }
                other => out.push(other),
            }
        }

        Ok(out)
    }
}

pub const INTENT_CLASSIFICATION: PromptTemplate = PromptTemplate {
    name: "intent_classification",
    input_variables: &["question"],
    template: r#"
You are an expert at understanding business questions about e-commerce data.

Analyze this question and extract:
1. Domain (orders, products, inventory, customers)
2. Metrics needed (count, sum, average, etc.)
3. Time period (if mentioned)
4. Any filters or conditions

Question: {question}

Return a JSON object with this structure:
{{
    "domain": "orders|products|inventory|customers",
    "metrics": ["count", "sum", "average"],
    "time_period": "last_7_days|last_30_days|last_week|next_month|etc",
    "filters": {{"product_name": "X", "status": "active"}},
    "intent_summary": "brief description"
}}

Be precise and only include information explicitly mentioned or clearly implied.
"#,
};

pub const QUERY_GENERATION: PromptTemplate = PromptTemplate {
    name: "query_generation",
    input_variables: &["question", "intent", "domain"],
    template: r#"
You are an expert at writing ShopifyQL queries.

Generate a ShopifyQL query to answer this question:
Question: {question}

Intent Analysis: {intent}
Domain: {domain}

ShopifyQL Guidelines:
- Use FROM clause with valid tables: orders, products, inventory, customers, line_items
- Use WHERE for filtering
- Use GROUP BY for aggregations
- Use ORDER BY for sorting
- Use LIMIT to restrict results
- Date format: 'YYYY-MM-DD'
- Use proper SQL syntax

Example queries:
1. "Top 5 products last week":
   FROM orders
   WHERE created_at >= DATE_SUB(NOW(), INTERVAL 7 DAY)
   GROUP BY product_id
   ORDER BY SUM(quantity) DESC
   LIMIT 5

2. "Low inventory products":
   FROM inventory
   WHERE quantity < 10
   ORDER BY quantity ASC

Generate ONLY the ShopifyQL query, no explanations:
"#,
};

pub const RESULT_EXPLANATION: PromptTemplate = PromptTemplate {
    name: "result_explanation",
    input_variables: &["question", "data", "query"],
    template: r#"
You are a business analyst explaining data insights to store owners.

Question: {question}
Query Used: {query}
Data Retrieved: {data}

Convert this technical data into a clear, actionable business insight.

Guidelines:
- Use simple, non-technical language
- Provide specific numbers and recommendations
- Be concise but informative
- Include confidence level (high/medium/low)
- Add reasoning if helpful

Return JSON:
{{
    "answer": "Clear business-friendly explanation with specific numbers and recommendations",
    "confidence": "high|medium|low",
    "reasoning": "Brief explanation of how you arrived at this answer"
}}

Focus on actionable insights the store owner can use.
"#,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_and_unescapes() {
        let rendered = INTENT_CLASSIFICATION
            .render(&PromptVariables::new().with("question", "How many orders?"))
            .unwrap();
        assert!(rendered.contains("Question: How many orders?"));
        assert!(rendered.contains("\"filters\": {\"product_name\": \"X\", \"status\": \"active\"},"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn test_render_reports_missing_variable() {
        let err = QUERY_GENERATION
            .render(&PromptVariables::new().with("question", "q"))
            .unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingVariable {
                template: "query_generation".to_string(),
                variable: "intent".to_string(),
            }
        );
    }

    #[test]
    fn test_values_are_not_reinterpreted() {
        let rendered = RESULT_EXPLANATION
            .render(
                &PromptVariables::new()
                    .with("question", "q")
                    .with("query", "FROM orders")
                    .with("data", "[{\"id\": 1}] {question}"),
            )
            .unwrap();
        assert!(rendered.contains("Data Retrieved: [{\"id\": 1}] {question}"));
    }

    #[test]
    fn test_declared_variables_cover_placeholders() {
        for template in [INTENT_CLASSIFICATION, QUERY_GENERATION, RESULT_EXPLANATION] {
            let vars = template
                .input_variables
                .iter()
                .fold(PromptVariables::new(), |vars, name| vars.with(*name, "x"));
            assert!(template.render(&vars).is_ok(), "{}", template.name);
        }
    }

    #[test]
    fn test_unterminated_placeholder() {
        let template = PromptTemplate {
            name: "broken",
            template: "Hello {name",
            input_variables: &["name"],
        };
        assert!(matches!(
            template.render(&PromptVariables::new().with("name", "x")),
            Err(PromptError::Unterminated { .. })
        ));
    }
}
