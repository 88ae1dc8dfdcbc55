use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What kind of operand a command expects, which steers path completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperandKind {
    File,
    Directory,
    #[default]
    None,
}

/// Completion metadata for one command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    #[serde(default)]
    pub operands: OperandKind,
    /// getopt-style letters; a letter followed by `:` takes an argument.
    #[serde(default)]
    pub options: Option<String>,
}

pub trait CommandResolver {
    /// The command an alias stands for, or `name` itself.
    fn resolve_alias(&self, name: &str) -> String;
    /// Alias names, in enumeration order.
    fn aliases(&self) -> Vec<String>;
    /// Known command names, in enumeration order.
    fn commands(&self) -> Vec<String>;
    fn operand_kind(&self, name: &str) -> OperandKind;
    fn option_spec(&self, name: &str) -> Option<String>;
}

const BUILTIN_COMMANDS: &[(&str, OperandKind, Option<&str>)] = &[
    ("bookmark", OperandKind::Directory, None),
    ("cat", OperandKind::File, Some("benstuv")),
    ("cd", OperandKind::Directory, None),
    ("chmod", OperandKind::File, Some("fhvR")),
    ("clear", OperandKind::None, None),
    ("cp", OperandKind::File, Some("afinpRvX")),
    ("du", OperandKind::File, Some("acd:hkmsx")),
    ("echo", OperandKind::None, Some("n")),
    ("env", OperandKind::None, None),
    ("exit", OperandKind::None, None),
    ("grep", OperandKind::File, Some("A:B:C:cEFHhiLlnoqrsvwx")),
    ("head", OperandKind::File, Some("n:c:")),
    ("history", OperandKind::None, None),
    ("less", OperandKind::File, None),
    ("ln", OperandKind::File, Some("Ffhinsv")),
    ("ls", OperandKind::File, Some("1AaCcdFfHhiLlmnopqRrSsTtux")),
    ("mkdir", OperandKind::Directory, Some("m:pv")),
    ("mv", OperandKind::File, Some("finv")),
    ("pwd", OperandKind::None, Some("LP")),
    ("python3", OperandKind::File, None),
    ("rm", OperandKind::File, Some("dfiPRrvW")),
    ("rmdir", OperandKind::Directory, Some("p")),
    ("tail", OperandKind::File, Some("Ffrn:c:")),
    ("touch", OperandKind::File, Some("acmr:t:")),
    ("vim", OperandKind::File, None),
    ("wc", OperandKind::File, Some("clmw")),
];

/// Resolver backed by fixed tables, usually built from configuration.
///
/// Names are enumerated in insertion order; [`StaticResolver::from_tables`]
/// sorts them alphabetically.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    aliases: Vec<(String, String)>,
    commands: Vec<(String, CommandSpec)>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builtin command table merged with configured aliases and commands.
    /// Configured entries override builtin ones of the same name.
    pub fn from_tables(
        aliases: &BTreeMap<String, String>,
        commands: &BTreeMap<String, CommandSpec>,
    ) -> Self {
        let mut table: BTreeMap<String, CommandSpec> = BUILTIN_COMMANDS
            .iter()
            .map(|(name, operands, options)| {
                (
                    (*name).to_string(),
                    CommandSpec {
                        operands: *operands,
                        options: options.map(str::to_string),
                    },
                )
            })
            .collect();
        table.extend(commands.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            aliases: aliases.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            commands: table.into_iter().collect(),
        }
    }

    pub fn with_alias(mut self, name: &str, target: &str) -> Self {
        self.aliases.push((name.to_string(), target.to_string()));
        self
    }

    pub fn with_command(mut self, name: &str, operands: OperandKind, options: Option<&str>) -> Self {
        self.commands.push((
            name.to_string(),
            CommandSpec {
                operands,
                options: options.map(str::to_string),
            },
        ));
        self
    }

    fn spec(&self, name: &str) -> Option<&CommandSpec> {
        self.commands
            .iter()
            .find(|(command, _)| command == name)
            .map(|(_, spec)| spec)
    }
}

impl CommandResolver for StaticResolver {
    fn resolve_alias(&self, name: &str) -> String {
        self.aliases
            .iter()
            .find(|(alias, _)| alias == name)
            .and_then(|(_, target)| target.split_whitespace().next())
            .unwrap_or(name)
            .to_string()
    }

    fn aliases(&self) -> Vec<String> {
        self.aliases.iter().map(|(name, _)| name.clone()).collect()
    }

    fn commands(&self) -> Vec<String> {
        self.commands.iter().map(|(name, _)| name.clone()).collect()
    }

    fn operand_kind(&self, name: &str) -> OperandKind {
        self.spec(name).map(|spec| spec.operands).unwrap_or_default()
    }

    fn option_spec(&self, name: &str) -> Option<String> {
        self.spec(name).and_then(|spec| spec.options.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_resolves_to_first_word() {
        let resolver = StaticResolver::new().with_alias("ll", "ls -l");
        assert_eq!(resolver.resolve_alias("ll"), "ls");
        assert_eq!(resolver.resolve_alias("cat"), "cat");
    }

    #[test]
    fn test_from_tables_sorts_and_overrides() {
        let mut commands = BTreeMap::new();
        commands.insert(
            "ls".to_string(),
            CommandSpec {
                operands: OperandKind::Directory,
                options: Some("la:F".to_string()),
            },
        );
        commands.insert("zsh".to_string(), CommandSpec::default());
        let resolver = StaticResolver::from_tables(&BTreeMap::new(), &commands);

        let names = resolver.commands();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.contains(&"zsh".to_string()));
        assert_eq!(resolver.operand_kind("ls"), OperandKind::Directory);
        assert_eq!(resolver.option_spec("ls").as_deref(), Some("la:F"));
        assert_eq!(resolver.operand_kind("cd"), OperandKind::Directory);
    }

    #[test]
    fn test_unknown_command_defaults() {
        let resolver = StaticResolver::new();
        assert_eq!(resolver.operand_kind("frob"), OperandKind::None);
        assert_eq!(resolver.option_spec("frob"), None);
    }
}
