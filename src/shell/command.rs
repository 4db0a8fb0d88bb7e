use colored::*;
use dialoguer::Confirm;
use std::error::Error;

use flatfs::{FileKind, FileSystemError};

use crate::shell::{format_with_progress, Session};

#[derive(Debug)]
pub enum Command {
    Help,
    Ls(Option<String>),
    Pwd,
    Mkdir(String),
    Rmdir(String),
    Create(String),
    Rm(String),
    Cd(String),
    Read(String),
    Write {
        file: String,
        offset: u64,
        content: String,
    },
    Stat(String),
    Df,
    Format,
    Exit,
}

/// 把命令参数解析成绝对路径
pub fn absolute(current_dir: &str, arg: &str) -> String {
    match arg {
        "." => current_dir.to_string(),
        ".." => "/".to_string(), // 只有两级，上一级总是根目录
        _ if arg.starts_with('/') => arg.to_string(),
        _ if current_dir == "/" => format!("/{}", arg),
        _ => format!("{}/{}", current_dir, arg),
    }
}

pub fn execute_command(cmd: &Command, session: &mut Session) -> Result<(), Box<dyn Error>> {
    let cwd = session.current_dir.clone();
    let fs = &mut session.fs;

    match cmd {
        Command::Help => print_help(),
        Command::Ls(target) => {
            let path = absolute(&cwd, target.as_deref().unwrap_or("."));
            for name in fs.list_directory(&path)? {
                let entry = absolute(&path, &name);
                let is_dir = name == "." || name == ".." || fs.get_attributes(&entry)?.is_dir();
                if is_dir {
                    println!("📁  {}", name.blue());
                } else {
                    println!("📄  {}", name);
                }
            }
        }
        Command::Pwd => println!("📍 {}", cwd.cyan()),
        Command::Mkdir(name) => {
            let path = absolute(&cwd, name);
            fs.create_directory(&path)?;
            println!("✅ Created directory: {}", path.green());
        }
        Command::Rmdir(name) => {
            let path = absolute(&cwd, name);
            fs.remove_directory(&path)?;
            println!("{}", format!("⚠️  Deletion is not supported, {} left in place", path).yellow());
        }
        Command::Create(name) => {
            let path = absolute(&cwd, name);
            fs.create_file(&path)?;
            println!("📝 Created file: {}", path.green());
        }
        Command::Rm(name) => {
            let path = absolute(&cwd, name);
            fs.remove_file(&path)?;
            println!("{}", format!("⚠️  Deletion is not supported, {} left in place", path).yellow());
        }
        Command::Cd(target) => {
            let path = absolute(&cwd, target);
            if !fs.get_attributes(&path)?.is_dir() {
                return Err(Box::new(FileSystemError::NotPermitted(format!("{} is not a directory", path))));
            }
            session.current_dir = if path.len() > 1 {
                path.trim_end_matches('/').to_string()
            } else {
                path
            };
            println!("📂 Moved to {}", session.current_dir.blue());
        }
        Command::Read(file) => {
            let path = absolute(&cwd, file);
            let size = fs.get_attributes(&path)?.size as usize;
            let data = fs.read(&path, size, 0)?;
            println!("📖 {} ({} bytes)", path.cyan(), data.len());
            println!("{}", String::from_utf8_lossy(&data));
        }
        Command::Write { file, offset, content } => {
            let path = absolute(&cwd, file);
            fs.open(&path)?;
            let written = fs.write(&path, content.as_bytes(), *offset)?;
            fs.flush(&path)?;
            println!("✏️  Wrote {} bytes to {}", written, path.cyan());
        }
        Command::Stat(file) => {
            let path = absolute(&cwd, file);
            let attr = fs.get_attributes(&path)?;
            let kind = match attr.kind {
                FileKind::Directory => "Directory",
                FileKind::RegularFile => "File",
            };
            println!(
                "{}\n{}: {}\n{}: {}\n{}: {:o}\n{}: {}\n{}: {} bytes\n",
                "📊 File Info".bright_yellow().bold(),
                "Name".blue(),
                path,
                "Type".blue(),
                kind,
                "Mode".blue(),
                attr.mode.bits(),
                "Links".blue(),
                attr.nlink,
                "Size".blue(),
                attr.size
            );
        }
        Command::Df => {
            let layout = *fs.layout();
            let free = fs.free_blocks()?;
            println!(
                "💾 {} of {} blocks free ({} bytes per block, {} byte bitmap)",
                free.to_string().green(),
                layout.block_count,
                flatfs::disk::BLOCK_SIZE,
                layout.bitmap_len
            );
        }
        Command::Format => {
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Erase everything in {}?",
                    session.config.image_path.display()
                ))
                .default(false)
                .interact()?;
            if confirmed {
                format_with_progress(&session.config)?;
                session.remount()?;
                println!("{}", "✅ Disk formatted successfully!".green());
            }
        }
        Command::Exit => println!("{}", "👋 Exiting flatfs shell...".yellow().bold()),
    }

    Ok(())
}

fn print_help() {
    println!("{}", "📘 flatfs Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  ls [dir]                  List a directory
  pwd                       Print current path
  cd <dir>                  Change directory
  mkdir <dir>               Create directory (root only, 8 chars)
  create <file>             Create file (name.ext, 8.3)
  read <file>               Print file content
  write <file> <str>        First write fixes the file size
  patch <file> <off> <str>  Overwrite bytes inside a written file
  stat <path>               Show attributes
  df                        Show free blocks
  rmdir <dir> / rm <file>   Accepted, nothing is deleted
  format                    Erase and re-create the image
  help                      Show this help message
  exit                      Quit the shell
"
        .bright_black()
    );
}
