use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

impl Project {
    pub fn new(id: &str, name: &str) -> Project {
        return Project {
            id: id.to_string(),
            name: name.to_string(),
        };
    }
}
