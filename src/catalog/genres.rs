use std::collections::HashMap;

use crate::tmdb::Genre;

/// Genre id to name lookup, loaded once per process.
#[derive(Debug, Clone, Default)]
pub struct GenreTable {
    genres: Vec<Genre>,
    by_id: HashMap<u32, usize>,
}

impl GenreTable {
    pub fn new(genres: Vec<Genre>) -> Self {
        let by_id = genres
            .iter()
            .enumerate()
            .map(|(index, genre)| (genre.id, index))
            .collect();
        Self { genres, by_id }
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(|&index| self.genres[index].name.as_str())
    }

    /// Resolve a genre given either as an id ("28") or as a name ("action").
    pub fn resolve(&self, value: &str) -> Option<&Genre> {
        let value = value.trim();
        if let Ok(id) = value.parse::<u32>() {
            return self.by_id.get(&id).map(|&index| &self.genres[index]);
        }
        self.genres.iter().find(|g| g.name.eq_ignore_ascii_case(value))
    }

    /// Comma-joined names for `ids`; unknown ids are skipped.
    pub fn join_names(&self, ids: &[u32]) -> String {
        ids.iter()
            .filter_map(|&id| self.name(id))
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn genres(&self) -> &[Genre] {
        &self.genres
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> GenreTable {
        GenreTable::new(vec![
            Genre { id: 28, name: "Action".to_string() },
            Genre { id: 12, name: "Adventure".to_string() },
            Genre { id: 878, name: "Science Fiction".to_string() },
        ])
    }

    #[test]
    fn test_join_names() {
        let genres = table();
        assert_eq!(genres.join_names(&[28, 878]), "Action, Science Fiction");
        assert_eq!(genres.join_names(&[28, 9999, 12]), "Action, Adventure");
        assert_eq!(genres.join_names(&[]), "");
        assert_eq!(GenreTable::default().join_names(&[28]), "");
    }

    #[test]
    fn test_resolve() {
        let genres = table();
        assert_eq!(genres.resolve("878").map(|g| g.name.as_str()), Some("Science Fiction"));
        assert_eq!(genres.resolve("adventure").map(|g| g.id), Some(12));
        assert!(genres.resolve("Western").is_none());
        assert!(genres.resolve("37").is_none());
    }
}
