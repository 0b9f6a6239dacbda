//! Built-in command table
//!
//! Plugins may not shadow the commands the client ships with. The table is
//! built once at startup and handed to the validator as a [`CommandList`].

use std::collections::HashSet;

/// Lookup of reserved command names and aliases.
pub trait CommandList {
    /// Whether `name` is the name of a reserved command.
    fn has_command(&self, name: &str) -> bool;

    /// Whether `alias` is the alias of a reserved command.
    fn has_alias(&self, alias: &str) -> bool;
}

/// `(name, alias)` of every built-in command. An empty alias means none.
const BUILTIN: &[(&str, &str)] = &[
    ("add-plugin-repo", ""),
    ("api", ""),
    ("apps", "a"),
    ("auth", ""),
    ("bind-service", "bs"),
    ("config", ""),
    ("create-service", "cs"),
    ("create-space", ""),
    ("curl", ""),
    ("delete", "d"),
    ("delete-service", "ds"),
    ("domains", ""),
    ("env", "e"),
    ("events", ""),
    ("help", "h"),
    ("install-plugin", ""),
    ("list-plugin-repos", ""),
    ("login", "l"),
    ("logout", "lo"),
    ("logs", ""),
    ("marketplace", "m"),
    ("orgs", "o"),
    ("plugins", ""),
    ("push", "p"),
    ("remove-plugin-repo", ""),
    ("rename", ""),
    ("repo-plugins", ""),
    ("restage", "rg"),
    ("restart", "rs"),
    ("routes", "r"),
    ("scale", ""),
    ("services", "s"),
    ("set-env", "se"),
    ("spaces", ""),
    ("ssh", ""),
    ("start", "st"),
    ("stop", "sp"),
    ("target", "t"),
    ("uninstall-plugin", ""),
    ("unset-env", ""),
    ("version", ""),
];

/// The commands compiled into the client.
#[derive(Debug, Clone)]
pub struct BuiltinCommands {
    names: HashSet<String>,
    aliases: HashSet<String>,
}

impl Default for BuiltinCommands {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinCommands {
    /// The standard table.
    pub fn new() -> Self {
        Self::from_pairs(BUILTIN.iter().copied())
    }

    /// A table from `(name, alias)` pairs. Empty aliases are skipped.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut names = HashSet::new();
        let mut aliases = HashSet::new();
        for (name, alias) in pairs {
            names.insert(name.to_string());
            if !alias.is_empty() {
                aliases.insert(alias.to_string());
            }
        }
        Self { names, aliases }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl CommandList for BuiltinCommands {
    fn has_command(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    fn has_alias(&self, alias: &str) -> bool {
        self.aliases.contains(alias)
    }
}
