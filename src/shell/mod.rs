pub mod command;
pub mod parse;

use crate::shell::{command::execute_command, parse::parse_command};
use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use dialoguer::Confirm;
use flatfs::{
    disk::{perform_disk_initialization, BootProgress},
    fs::layout::DiskLayout,
    FileSystem, FileSystemError, FsConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::error;
use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};
use std::{
    io::{self, stdout},
    path::PathBuf,
    process,
    sync::mpsc,
    thread,
};

/// 一次 shell 会话：挂载的文件系统与当前目录
pub struct Session {
    pub config: FsConfig,
    pub fs: FileSystem,
    pub current_dir: String,
}

impl Session {
    /// 重新加载镜像，例如格式化之后
    pub fn remount(&mut self) -> Result<(), FileSystemError> {
        self.fs = FileSystem::mount(&self.config)?;
        self.current_dir = String::from("/");
        Ok(())
    }
}

pub fn start_shell(config: FsConfig) {
    banner(&config);

    let session = match boot(config) {
        Ok(session) => session,
        Err(e) => {
            // 镜像不可用是致命错误
            error!("{}", e);
            println!("{} {}", "❌ Cannot mount:".red().bold(), e);
            process::exit(1);
        }
    };
    run(session);
}

fn boot(config: FsConfig) -> Result<Session, FileSystemError> {
    if !config.image_path.exists() {
        let create = Confirm::new()
            .with_prompt(format!(
                "No image at {}. Format a new one?",
                config.image_path.display()
            ))
            .default(true)
            .interact()
            .unwrap_or(false);
        if create {
            format_with_progress(&config)?;
        }
    }

    println!("{}", "⚙️  Mounting file system...".bright_black());
    let fs = FileSystem::mount(&config)?;
    Ok(Session {
        config,
        fs,
        current_dir: String::from("/"),
    })
}

/// 在后台线程格式化镜像，前台用进度条显示
pub fn format_with_progress(config: &FsConfig) -> Result<(), FileSystemError> {
    let (tx, rx) = mpsc::channel();
    let path = config.image_path.clone();
    let layout = DiskLayout::new(config.bitmap);
    let worker = thread::spawn(move || perform_disk_initialization(path, layout, tx));

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let mut outcome = None;
    for message in rx {
        match message {
            BootProgress::Step(step) => pb.set_message(step),
            BootProgress::Progress(percent) => pb.set_position(percent),
            BootProgress::Finished(finished) => {
                outcome = Some(finished.map(|_| ()));
                break;
            }
        }
    }
    let result = format_outcome(outcome, worker.join());

    match &result {
        Ok(()) => pb.finish_with_message("✅ Ready!"),
        Err(_) => pb.abandon_with_message("❌ Format failed"),
    }
    result
}

// 工作线程没有发出 Finished 就退出（例如 panic）时，格式化视为失败
fn format_outcome(
    outcome: Option<Result<(), FileSystemError>>,
    joined: thread::Result<()>,
) -> Result<(), FileSystemError> {
    match (outcome, joined) {
        (Some(result), Ok(())) => result,
        (Some(Err(e)), Err(_)) => Err(e),
        _ => Err(FileSystemError::Io(io::Error::other(
            "format worker stopped before finishing",
        ))),
    }
}

fn banner(config: &FsConfig) {
    let mut stdout = stdout();
    let _ = execute!(
        stdout,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        Print(format!("Welcome to flatfs v{}\n", env!("CARGO_PKG_VERSION"))),
        ResetColor
    );
    println!(
        "{} {}",
        "Image:".bright_black(),
        config.image_path.display().to_string().bright_blue()
    );
}

fn run(mut session: Session) {
    let username = whoami::username();
    let hostname = whoami::hostname();

    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".flatfs_history");

    let mut line_editor = Reedline::create();
    match reedline::FileBackedHistory::with_file(100, history_path) {
        Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
        Err(e) => error!("history disabled: {}", e),
    }

    let commands = vec![
        "help", "ls", "pwd", "mkdir", "rmdir", "create", "rm", "cd", "read", "write", "patch",
        "stat", "df", "format", "exit",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    let completer = reedline::DefaultCompleter::new_with_wordlen(commands, 2);
    line_editor = line_editor.with_completer(Box::new(completer));

    loop {
        let full_prompt = format!(
            "{}:{}",
            format!("{}@{}", username, hostname).green(),
            session.current_dir.blue()
        );
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic(full_prompt),
            DefaultPromptSegment::Basic("flatfs".bright_blue().bold().to_string()),
        );

        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Some(cmd) => {
                        if let Err(e) = execute_command(&cmd, &mut session) {
                            println!("{} {}", "❌ Error:".red().bold(), e);
                        }
                        if matches!(cmd, command::Command::Exit) {
                            break;
                        }
                    }
                    None => println!(
                        "{}",
                        "⚠️  Unknown command. Type 'help' for command list.".yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting flatfs...".yellow());
                break;
            }
            Err(e) => {
                error!("error reading line: {}", e);
                break;
            }
        }
    }

    println!("{}", "GoodBye!".bright_yellow());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_format_is_reported() {
        assert!(format_outcome(Some(Ok(())), Ok(())).is_ok());
        let failed = Some(Err(FileSystemError::NotPermitted("x".into())));
        assert!(matches!(
            format_outcome(failed, Ok(())),
            Err(FileSystemError::NotPermitted(_))
        ));
    }

    #[test]
    fn worker_panic_is_a_failed_format() {
        let joined: thread::Result<()> = thread::spawn(|| panic!("disk full")).join();
        assert!(joined.is_err());
        assert!(matches!(
            format_outcome(None, joined),
            Err(FileSystemError::Io(_))
        ));
    }

    #[test]
    fn closed_channel_without_finish_is_a_failed_format() {
        assert!(format_outcome(None, Ok(())).is_err());
    }
}
