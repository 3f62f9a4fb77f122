use bimap::BiMap;

/// An interned symbol name.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Name(usize);

/// Two-way mapping between names and their text.
#[derive(Debug, Default)]
pub struct Names {
    names: BiMap<Name, String>,
}

impl Names {
    pub fn new() -> Self {
        Self {
            names: BiMap::new(),
        }
    }

    pub fn add(&mut self, text: impl Into<String>) -> Name {
        let text = text.into();
        if let Some(name) = self.names.get_by_right(&text) {
            return *name;
        }

        let name = Name(self.names.len());
        self.names.insert(name, text);
        name
    }

    pub fn get(&self, name: Name) -> &str {
        // only this module makes names, so they are always mapped
        self.names.get_by_left(&name).unwrap()
    }

    pub fn lookup(&self, text: &str) -> Option<Name> {
        self.names.get_by_right(text).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::Names;

    #[test]
    fn adding_twice_gives_same_name() {
        let mut names = Names::new();
        let a = names.add("putchar");
        let b = names.add("putchar");
        assert_eq!(a, b);
        assert_eq!("putchar", names.get(a));
    }

    #[test]
    fn distinct_text_distinct_names() {
        let mut names = Names::new();
        let a = names.add("f");
        let b = names.add("g");
        assert_ne!(a, b);
        assert_eq!(Some(a), names.lookup("f"));
        assert_eq!(None, names.lookup("h"));
    }
}
