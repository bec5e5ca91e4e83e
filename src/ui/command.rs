use tokio::process::Command;
use tracing::info;

use super::{AudioPlayer, AudioRef, LocalSpeech};
use crate::error::{AgentError, AgentResult};

/// Runs `program args... <argument>` and waits for it to exit successfully
async fn run_to_completion(program: &str, args: &[String], argument: &str) -> AgentResult<()> {
    let status = Command::new(program)
        .args(args)
        .arg(argument)
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| AgentError::Playback(format!("Failed to run {}: {}", program, e)))?;

    if status.success() {
        Ok(())
    } else {
        Err(AgentError::Playback(format!("{} exited with {}", program, status)))
    }
}

/// Plays audio references with an external program, e.g. `ffplay -nodisp -autoexit`
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    /// Build from a command line such as `["ffplay", "-nodisp", "-autoexit"]`
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait::async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, audio: &AudioRef) -> AgentResult<()> {
        info!("Playing {} with {}", audio, self.program);
        run_to_completion(&self.program, &self.args, audio.as_str()).await
    }
}

/// Speaks text with an external synthesizer, e.g. `espeak`
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
}

impl CommandSpeech {
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait::async_trait]
impl LocalSpeech for CommandSpeech {
    async fn speak(&self, text: &str) -> AgentResult<()> {
        run_to_completion(&self.program, &self.args, text).await
    }
}
