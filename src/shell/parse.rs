use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.split_ascii_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let cmd = tokens[0];
    let args = &tokens[1..];

    match cmd {
        "help" => Some(Command::Help),
        "ls" => Some(Command::Ls(args.first().map(|s| s.to_string()))),
        "pwd" => Some(Command::Pwd),
        "mkdir" => args.first().map(|&name| Command::Mkdir(name.to_string())),
        "rmdir" => args.first().map(|&name| Command::Rmdir(name.to_string())),
        "create" | "touch" => args.first().map(|&name| Command::Create(name.to_string())),
        "rm" => args.first().map(|&name| Command::Rm(name.to_string())),
        "cd" => Some(Command::Cd(args.first().unwrap_or(&"/").to_string())),
        "read" | "cat" => args.first().map(|&name| Command::Read(name.to_string())),
        "write" => {
            if args.len() >= 2 {
                Some(Command::Write {
                    file: args[0].to_string(),
                    offset: 0,
                    content: args[1..].join(" "),
                })
            } else {
                None
            }
        }
        "patch" => {
            if args.len() >= 3 {
                Some(Command::Write {
                    file: args[0].to_string(),
                    offset: args[1].parse().ok()?,
                    content: args[2..].join(" "),
                })
            } else {
                None
            }
        }
        "stat" => args.first().map(|&name| Command::Stat(name.to_string())),
        "df" => Some(Command::Df),
        "format" => Some(Command::Format),
        "exit" | "quit" => Some(Command::Exit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_joins_remaining_words() {
        match parse_command("write /docs/a.txt hello  world") {
            Some(Command::Write { file, offset, content }) => {
                assert_eq!(file, "/docs/a.txt");
                assert_eq!(offset, 0);
                assert_eq!(content, "hello world");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn patch_takes_an_offset() {
        assert!(matches!(
            parse_command("patch a.txt 3 xyz"),
            Some(Command::Write { offset: 3, .. })
        ));
        assert!(parse_command("patch a.txt three xyz").is_none());
    }

    #[test]
    fn missing_arguments() {
        assert!(parse_command("mkdir").is_none());
        assert!(parse_command("write a.txt").is_none());
        assert!(matches!(parse_command("cd"), Some(Command::Cd(p)) if p == "/"));
        assert!(parse_command("frobnicate").is_none());
    }
}
