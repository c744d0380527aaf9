//! Fluent assembly of a contract's form fields.

use super::ContractElement;

/// Collects fields in declaration order, marking them mandatory or optional.
#[derive(Debug, Clone, Default)]
pub struct ContractBuilder {
    fields: Vec<ContractElement>,
}

impl ContractBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append fields as they are.
    pub fn add_fields(mut self, fields: impl IntoIterator<Item = ContractElement>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn mandatory(mut self, mut element: ContractElement) -> Self {
        element.mandatory = true;
        self.fields.push(element);
        self
    }

    pub fn optional(mut self, mut element: ContractElement) -> Self {
        element.mandatory = false;
        self.fields.push(element);
        self
    }

    /// Fields of which at least one must be filled. Each member lists the
    /// keys of the whole group.
    pub fn mandatory_group(mut self, elements: impl IntoIterator<Item = ContractElement>) -> Self {
        let elements: Vec<ContractElement> = elements.into_iter().collect();
        let keys: Vec<String> = elements.iter().map(|e| e.key.clone()).collect();
        for mut element in elements {
            element.mandatory = true;
            element.mandatory_groups = Some(keys.clone());
            self.fields.push(element);
        }
        self
    }

    pub fn build(self) -> Vec<ContractElement> {
        self.fields
    }
}
