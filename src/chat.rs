//! In-conversation commands
//!
//! Lines starting with `!` are commands rather than messages:
//! `!persona <name>`, `!list`, `!reset`, `!save`, `!traits`.

use crate::persona::engine::{MessageOutcome, PersonaEngine};

pub const UNKNOWN_COMMAND: &str = "未知命令。可用命令: !persona, !list, !reset, !save, !traits";

const FAILED: &str = "操作失败，请稍后再试";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Persona(Option<String>),
    List,
    Reset,
    Save,
    Traits,
    Unknown(String),
}

impl ChatCommand {
    /// Parse a `!`-prefixed line; `None` for ordinary messages
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with('!') {
            return None;
        }

        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default().to_lowercase();
        let command = match name.as_str() {
            "!persona" => ChatCommand::Persona(parts.next().map(String::from)),
            "!list" => ChatCommand::List,
            "!reset" => ChatCommand::Reset,
            "!save" => ChatCommand::Save,
            "!traits" => ChatCommand::Traits,
            _ => ChatCommand::Unknown(name),
        };
        Some(command)
    }

    /// Run the command for `user_id` and produce the reply text
    pub fn execute(&self, engine: &mut PersonaEngine, user_id: &str) -> String {
        match self {
            ChatCommand::Persona(None) => "请指定人格模板名称".to_string(),
            ChatCommand::Persona(Some(name)) => match engine.switch_template(user_id, name) {
                Ok(true) => format!("已切换到{}模板", name),
                Ok(false) => "未找到指定模板".to_string(),
                Err(e) => failed(user_id, e),
            },
            ChatCommand::List => {
                let roles = engine.templates().roles();
                if roles.is_empty() {
                    "暂无可用模板".to_string()
                } else {
                    format!("可用模板: {}", roles.join(", "))
                }
            }
            ChatCommand::Reset => match engine.reset(user_id) {
                Ok(()) => "已重置你的人格画像".to_string(),
                Err(e) => failed(user_id, e),
            },
            ChatCommand::Save => match engine.save_profile(user_id) {
                Ok(keywords) if keywords.is_empty() => "当前对话中没有可保存的内容".to_string(),
                Ok(keywords) => format!("已保存当前对话画像: {}", keywords.join("、")),
                Err(e) => failed(user_id, e),
            },
            ChatCommand::Traits => {
                let record = engine.traits(user_id);
                if record.traits.is_empty() {
                    return "暂无特征记录".to_string();
                }
                let lines: Vec<String> = record
                    .traits
                    .iter()
                    .map(|(tag, weight)| format!("- {} ({})", tag, weight))
                    .collect();
                format!("当前模板: {}\n当前特征:\n{}", engine.template_for(user_id), lines.join("\n"))
            }
            ChatCommand::Unknown(_) => UNKNOWN_COMMAND.to_string(),
        }
    }
}

fn failed(user_id: &str, e: eyre::Report) -> String {
    log::error!("Command failed for {}: {:#}", user_id, e);
    FAILED.to_string()
}

/// Handle one line of conversation: a command, or a message for the pipeline.
/// Returns the reply to send back, if any.
pub fn handle_line(engine: &mut PersonaEngine, user_id: &str, line: &str) -> Option<String> {
    if let Some(command) = ChatCommand::parse(line) {
        return Some(command.execute(engine, user_id));
    }

    match engine.handle_message(user_id, line) {
        MessageOutcome::QuickReply(reply) => Some(reply),
        outcome => {
            log::debug!("Message from {}: {:?}", user_id, outcome);
            None
        }
    }
}
