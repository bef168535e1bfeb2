//! Scholar application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing
//! 3. Build the Gemini gateway (credential read once from the environment)
//! 4. Run one panel: a single question, an interactive chat, or a structured task

mod cli;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use scholar_chat::{
    tasks, ChatError, ChatOrchestrator, DebugAnalysis, LiveTurn, ProjectIdea, QuizQuestion,
    SendRequest, SkillFeedback, WebsiteCode,
};
use scholar_core::{
    logging, ConversationHistory, MediaAttachment, PromptPart, ScholarConfig, ScholarError,
};
use scholar_gateway::GeminiGateway;

use cli::{CliArgs, Command};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let (config, config_problem) = cli::load_config(&config_file);
    logging::init(&args.resolve_log_level(&config.general.log_level));

    tracing::info!(
        path = %config_file.display(),
        "Starting Scholar v{}",
        env!("CARGO_PKG_VERSION")
    );
    if let Some(problem) = config_problem {
        tracing::warn!(
            path = %config_file.display(),
            error = %problem,
            "Configuration rejected, using defaults"
        );
    }

    if let Err(e) = run(args.command, config).await {
        tracing::debug!(error = %e, "Command failed");
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(command: Command, config: ScholarConfig) -> Result<(), ChatError> {
    let gateway = GeminiGateway::from_env(&config.gateway, &config.images)?;
    tracing::debug!(credential = gateway.has_credential(), "Gateway ready");
    let orchestrator =
        ChatOrchestrator::new(Arc::new(gateway), config.chat.clone(), config.images.max_images);

    match command {
        Command::Ask { prompt } => {
            let answer = orchestrator.ask(&[PromptPart::text(prompt)]).await?;
            println!("{}", answer);
        }
        Command::Chat { notes, attach } => {
            let notes = match notes {
                Some(path) => Some(
                    tokio::fs::read_to_string(&path)
                        .await
                        .map_err(ScholarError::from)?,
                ),
                None => None,
            };
            let attachment = match attach {
                Some(path) => Some(read_attachment(&path).await?),
                None => None,
            };
            chat_loop(&orchestrator, notes, attachment).await?;
        }
        Command::Quiz { topic, count } => {
            let quiz: Vec<QuizQuestion> = orchestrator
                .request_structured(&tasks::quiz_prompt(&topic, count)?)
                .await?;
            print_quiz(&quiz);
        }
        Command::Feedback {
            skill,
            goal,
            progress,
        } => {
            let fb: SkillFeedback = orchestrator
                .request_structured(&tasks::feedback_prompt(&skill, &goal, &progress)?)
                .await?;
            println!("Badge: {}\n\n{}\n", fb.badge_name, fb.feedback);
            for step in &fb.next_steps {
                println!("  - {}", step);
            }
        }
        Command::Ideas { domain, level } => {
            let ideas: Vec<ProjectIdea> = orchestrator
                .request_structured(&tasks::ideas_prompt(&domain, &level)?)
                .await?;
            print_ideas(&ideas);
        }
        Command::Debug { file, error } => {
            let code = tokio::fs::read_to_string(&file)
                .await
                .map_err(ScholarError::from)?;
            let analysis: DebugAnalysis = orchestrator
                .request_structured(&tasks::debug_prompt(&code, error.as_deref())?)
                .await?;
            println!(
                "Language: {}\n\nWhat is wrong:\n{}\n\nSuggested fix:\n{}\n\nOptimized code:\n{}",
                analysis.language,
                analysis.error_analysis,
                analysis.suggested_fix,
                analysis.optimized_code
            );
        }
        Command::Website { description, out } => {
            let site: WebsiteCode = orchestrator
                .request_structured(&tasks::website_prompt(&description)?)
                .await?;
            let page = site.to_document();
            match out {
                Some(path) => {
                    tokio::fs::write(&path, page)
                        .await
                        .map_err(ScholarError::from)?;
                    println!("Website written to {}", path.display());
                }
                None => println!("{}", page),
            }
        }
        Command::Images {
            prompt,
            count,
            out_dir,
        } => {
            let images = orchestrator.generate_images(&prompt, count).await?;
            tokio::fs::create_dir_all(&out_dir)
                .await
                .map_err(ScholarError::from)?;
            for (i, image) in images.iter().enumerate() {
                let path = out_dir.join(format!(
                    "image-{}.{}",
                    i + 1,
                    cli::extension_for(&image.media_type)
                ));
                tokio::fs::write(&path, &image.bytes)
                    .await
                    .map_err(ScholarError::from)?;
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}

async fn read_attachment(path: &Path) -> Result<MediaAttachment, ChatError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(ScholarError::from)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    tracing::info!(name = %name, bytes = bytes.len(), "Attachment loaded");
    Ok(MediaAttachment::new(name, cli::media_type_for(path), bytes))
}

/// Interactive chat. `/reset` clears the conversation, `/quit` or EOF exits.
async fn chat_loop(
    orchestrator: &ChatOrchestrator,
    notes: Option<String>,
    mut attachment: Option<MediaAttachment>,
) -> Result<(), ChatError> {
    let printer = tokio::spawn(print_live(orchestrator.subscribe()));
    let mut history = ConversationHistory::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(ScholarError::from)?
    {
        match line.trim() {
            "" => {}
            "/quit" => break,
            "/reset" => {
                history.reset();
                println!("(conversation cleared)");
            }
            text => {
                let sent =
                    send_turn(orchestrator, &mut history, text, notes.as_deref(), &mut attachment)
                        .await;
                match sent {
                    Ok(_) => {}
                    // Stream failures are already visible in the turn.
                    Err(ChatError::Core(ScholarError::Remote(_))) => {}
                    Err(e) => eprintln!("{}", e.user_message()),
                }
            }
        }
        prompt();
    }

    printer.abort();
    orchestrator.dismiss();
    Ok(())
}

/// Send one chat line.
///
/// The pending attachment is used up only once a turn records it; a message
/// rejected before that keeps it for the next attempt.
async fn send_turn(
    orchestrator: &ChatOrchestrator,
    history: &mut ConversationHistory,
    text: &str,
    notes: Option<&str>,
    attachment: &mut Option<MediaAttachment>,
) -> Result<String, ChatError> {
    let mut request = SendRequest::new(text);
    request.notes = notes.map(str::to_string);
    request.attachment = attachment.clone();

    let before = history.len();
    let result = orchestrator.send_message(history, request).await;
    if history.len() > before {
        attachment.take();
    }
    result
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Print each streamed snapshot's new suffix as it arrives.
async fn print_live(mut rx: tokio::sync::watch::Receiver<Option<LiveTurn>>) {
    let mut current = None;
    let mut printed = 0usize;
    while rx.changed().await.is_ok() {
        let Some(turn) = rx.borrow_and_update().clone() else {
            continue;
        };
        if current != Some(turn.turn_id) {
            current = Some(turn.turn_id);
            printed = 0;
        }
        if let Some(delta) = turn.content.get(printed..) {
            print!("{}", delta);
            printed = turn.content.len();
        }
        if turn.finished {
            println!();
        }
        let _ = std::io::stdout().flush();
    }
}

fn print_quiz(quiz: &[QuizQuestion]) {
    for (i, q) in quiz.iter().enumerate() {
        println!("{}. {}", i + 1, q.question);
        for (letter, option) in ['A', 'B', 'C', 'D'].iter().zip(q.options.iter()) {
            println!("   {}) {}", letter, option);
        }
        println!("   Answer: {}\n", q.correct_answer);
    }
}

fn print_ideas(ideas: &[ProjectIdea]) {
    for idea in ideas {
        println!("## {}\n{}\n", idea.title, idea.description);
        println!("Key features: {}", idea.key_features.join(", "));
        println!("Tech stack: {}", idea.tech_stack.join(", "));
        if let Some(ref dataset) = idea.dataset_source {
            println!("Dataset: {}", dataset);
        }
        if let Some(ref arch) = idea.architecture {
            println!("Architecture: {}", arch);
        }
        if let Some(ref tips) = idea.deployment_tips {
            println!("Deployment: {}", tips);
        }
        println!();
    }
}
