use serde::{Deserialize, Serialize};
use std::fmt;

/// The protagonist of one story session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Character {
    pub name: String,
    pub age: i64,
    pub profession: String,
}

impl Character {
    pub fn new(name: impl Into<String>, age: i64, profession: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age,
            profession: profession.into(),
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, a {}-year-old {}", self.name, self.age, self.profession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_display() {
        let mara = Character::new("Mara", 34, "lighthouse keeper");
        assert_eq!(mara.to_string(), "Mara, a 34-year-old lighthouse keeper");
    }
}
