use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Category;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: String,
}

impl CategoryRequest {
    /// The trimmed name, or `None` when blank.
    pub fn validated_name(&self) -> Option<String> {
        let name = self.name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}

#[cfg(test)]
mod tests {
    use super::CategoryRequest;

    #[test]
    fn blank_names_are_rejected_and_others_trimmed() {
        let blank = CategoryRequest { name: "   ".into() };
        assert_eq!(blank.validated_name(), None);

        let padded = CategoryRequest {
            name: "  Drinks ".into(),
        };
        assert_eq!(padded.validated_name().as_deref(), Some("Drinks"));
    }
}
