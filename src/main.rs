use async_trait::async_trait;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::error::Error;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use llmkit::client_wrapper::{ContentPart, StreamSink};
use llmkit::clients::ollama::OllamaClient;
use llmkit::clients::openai::OpenAICompatibleClient;
use llmkit::code_review::{CodeReviewer, DEFAULT_REVIEW_OUTPUT};
use llmkit::commit_message::{is_confirmed, suggested_command, CommitAssistant, TreeState};
use llmkit::conversation::{attachment_from_file, normalize_latex, ConversationStore, RESPONSE_FAILED};
use llmkit::daily_news::DailyDigest;
use llmkit::event::{AgentEvent, EventHandler, ResearchEvent, Termination};
use llmkit::page_ocr::PageConverter;
use llmkit::research::{render_markdown, ResearchConfig, ResearchStore};
use llmkit::tool_protocol::ToolRegistry;
use llmkit::tool_protocols::WebResearchProtocol;
use llmkit::tools::{merge_to_file, read_for_review, CodebaseSource, GitRunner};
use llmkit::translate::{Language, Translator, TRANSLATE_MODEL};
use llmkit::{ClientWrapper, Conversation, LlmKitConfig, ReActAgent, ResearchRunner, Role};

type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "llmkit", version, about = "LLM-powered command-line tools")]
struct Cli {
    #[command(flatten)]
    provider: ProviderArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ProviderArgs {
    /// Key for the OpenAI-compatible provider.
    #[arg(long, global = true, env = "SILICONFLOW_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible provider.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Key for Exa search.
    #[arg(long, global = true, env = "EXA_API_KEY", hide_env_values = true)]
    exa_api_key: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a question with a search-and-visit ReAct loop.
    React {
        query: String,
        #[arg(long, default_value_t = 7)]
        max_steps: usize,
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Multi-round deep research with a final synthesis.
    Research {
        query: String,
        /// Rounds of query generation (1-5).
        #[arg(short, long, default_value_t = 3)]
        depth: usize,
        #[arg(short, long, default_value_t = 5)]
        queries: usize,
        /// Comma-separated domain allow-list.
        #[arg(long, value_delimiter = ',')]
        domains: Vec<String>,
        #[arg(short, long)]
        model: Option<String>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Also append log lines to research_<timestamp>.log in this directory.
        #[arg(long)]
        log_dir: Option<PathBuf>,
        #[arg(long)]
        no_save: bool,
    },
    /// List saved research runs, or print one as Markdown.
    ResearchList {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        show: Option<String>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Generate a Conventional Commits message for the staged diff.
    CommitMsg {
        /// Stage everything first (git add -A).
        #[arg(short, long)]
        all: bool,
        /// Commit after confirmation.
        #[arg(short, long)]
        commit: bool,
        /// Push after committing.
        #[arg(short, long)]
        push: bool,
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Review a file, directory or git URL.
    Review {
        path: String,
        #[arg(short, long, default_value = DEFAULT_REVIEW_OUTPUT)]
        output: PathBuf,
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Merge a source tree into one context file.
    MergeContext {
        #[arg(default_value = ".")]
        source: String,
        #[arg(short, long, default_value = "context.txt")]
        output: PathBuf,
    },
    /// Build today's AI news digest.
    DailyNews {
        #[arg(short, long)]
        model: Option<String>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Translate text with a local model (reads stdin when TEXT is omitted).
    Translate {
        #[arg(long, default_value = "en")]
        from: String,
        #[arg(long, default_value = "es")]
        to: String,
        text: Option<String>,
        #[arg(long, default_value = TRANSLATE_MODEL)]
        model: String,
        #[arg(long, env = "OLLAMA_HOST")]
        ollama_url: Option<String>,
    },
    /// Interactive chat with saved history.
    Chat {
        /// Resume a saved conversation.
        #[arg(long)]
        resume: Option<String>,
        #[arg(long)]
        list: bool,
        #[arg(long)]
        delete: Option<String>,
        /// Image or audio files attached to the first message.
        #[arg(long)]
        attach: Vec<PathBuf>,
        #[arg(short, long)]
        model: Option<String>,
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        gemini_api_key: Option<String>,
    },
    /// Transcribe a directory of page images into Markdown.
    Pages2md {
        images_dir: PathBuf,
        #[arg(short, long, default_value = "output.md")]
        output: PathBuf,
        #[arg(long)]
        vision_model: Option<String>,
        #[arg(short, long)]
        model: Option<String>,
        #[arg(long, default_value_t = 5)]
        concurrency: usize,
    },
}

/// Terminal printer for stream deltas and agent/research events.
struct Console {
    show_content: bool,
    show_reasoning: bool,
}

impl Console {
    fn new(show_content: bool, show_reasoning: bool) -> Self {
        Self {
            show_content,
            show_reasoning,
        }
    }
}

impl StreamSink for Console {
    fn on_content(&self, delta: &str) {
        if self.show_content {
            print!("{}", delta);
            let _ = io::stdout().flush();
        }
    }

    fn on_reasoning(&self, delta: &str) {
        if self.show_reasoning {
            print!("{}", delta.dimmed());
            let _ = io::stdout().flush();
        }
    }
}

#[async_trait]
impl EventHandler for Console {
    async fn on_agent_event(&self, event: &AgentEvent) {
        match event {
            AgentEvent::Started { query, max_steps } => {
                println!("{} {} (max {} steps)", "❓".bold(), query.bold(), max_steps)
            }
            AgentEvent::LLMCallStarted { step } => {
                println!("\n{}", format!("--- Step {} ---", step).cyan().bold())
            }
            AgentEvent::ParseFailed { step } => {
                println!("\n{} step {}: no JSON decision found", "⚠".yellow(), step)
            }
            AgentEvent::DecisionParsed {
                thought,
                action,
                action_input,
                ..
            } => {
                println!("\n{} {}", "Thought:".blue().bold(), thought);
                println!("{} {} {}", "Action:".magenta().bold(), action, action_input.dimmed());
            }
            AgentEvent::ToolExecuted {
                action,
                observation_length,
                success,
                ..
            } => {
                let mark = if *success { "✓".green() } else { "✗".red() };
                println!("{} {} returned {} chars", mark, action, observation_length);
            }
            AgentEvent::Terminated { steps, reason } => {
                println!("{}", format!("Finished after {} steps: {:?}", steps, reason).dimmed())
            }
            AgentEvent::LLMCallCompleted { .. } => {}
        }
    }

    async fn on_research_event(&self, event: &ResearchEvent) {
        match event {
            ResearchEvent::Started {
                query,
                depth,
                total_steps,
            } => println!(
                "{} {} (depth {}, {} steps)",
                "🔬".bold(),
                query.bold(),
                depth,
                total_steps
            ),
            ResearchEvent::DepthStarted { level } => {
                println!("\n{}", format!("=== Depth {} ===", level).cyan().bold())
            }
            ResearchEvent::QueriesGenerated { queries, .. } => {
                for q in queries {
                    println!("  {} {}", "•".blue(), q);
                }
            }
            ResearchEvent::SearchCompleted {
                query,
                source_count,
            } => println!("  {} {} ({} sources)", "🔍".dimmed(), query, source_count),
            ResearchEvent::StepCompleted {
                completed,
                total,
                progress,
                ..
            } => println!(
                "  {} {}/{} ({:.0}%)",
                "✓".green(),
                completed,
                total,
                progress * 100.0
            ),
            ResearchEvent::SynthesisStarted { step_count, progress } => println!(
                "\n{} synthesising {} findings... ({:.0}%)",
                "📝".bold(),
                step_count,
                progress * 100.0
            ),
            ResearchEvent::SynthesisCompleted { progress } => {
                println!("  {} synthesis ({:.0}%)", "✓".green(), progress * 100.0)
            }
            ResearchEvent::Completed { elapsed_secs } => {
                println!("{}", format!("Done in {:.1}s", elapsed_secs).green())
            }
            ResearchEvent::Saved { filename } => println!("Saved as {}", filename.green()),
        }
    }
}

/// Writes every log line to stderr and a file.
struct TeeWriter {
    file: fs::File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

fn init_file_logger(dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("research_{}.log", Local::now().format("%Y%m%d_%H%M%S")));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(TeeWriter { file })))
        .init();
    Ok(path)
}

fn require_llm_key(config: &LlmKitConfig) -> CliResult<()> {
    if config.has_llm_key() {
        Ok(())
    } else {
        Err("SILICONFLOW_API_KEY not set (use --api-key or the environment)".into())
    }
}

/// One trimmed line from stdin; `None` once stdin is closed.
fn read_line() -> CliResult<Option<String>> {
    Ok(read_line_from(&mut io::stdin().lock())?)
}

fn read_line_from<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// What the user typed at the chat prompt.
#[derive(Debug, PartialEq)]
enum ChatInput {
    Exit,
    Attach(String),
    New,
    Blank,
    Text(String),
}

impl ChatInput {
    /// `None` (stdin closed) ends the session like `/exit`.
    fn parse(line: Option<String>) -> Self {
        let line = match line {
            Some(line) => line,
            None => return ChatInput::Exit,
        };
        if line == "/exit" || line == "/quit" {
            return ChatInput::Exit;
        }
        if let Some(path) = line.strip_prefix("/attach ") {
            return ChatInput::Attach(path.trim().to_string());
        }
        if line == "/new" {
            return ChatInput::New;
        }
        if line.is_empty() {
            return ChatInput::Blank;
        }
        ChatInput::Text(line)
    }
}

fn rule(c: char) -> String {
    c.to_string().repeat(50)
}

async fn run_react(config: &LlmKitConfig, query: &str, max_steps: usize, model: Option<String>) -> CliResult<()> {
    require_llm_key(config)?;
    let model = model.unwrap_or_else(|| config.chat_model.clone());
    let client = Arc::new(config.llm_client(&model));
    let web = Arc::new(WebResearchProtocol::new(Arc::new(config.exa_client())));
    let tools = ToolRegistry::from_protocol(web).await?;

    let console = Arc::new(Console::new(false, true));
    let outcome = ReActAgent::new(client, tools)
        .with_max_steps(max_steps)
        .with_event_handler(console.clone())
        .run(query, console.as_ref())
        .await;

    match (outcome.termination, outcome.answer) {
        (Termination::Answered, Some(answer)) => {
            println!("\n{}\n{}", "Final Answer:".green().bold(), answer)
        }
        (Termination::EmptyResponse, _) => println!("\n{}", "Empty response from the model.".red()),
        _ => println!("\n{}", "Max steps reached without an answer.".yellow()),
    }
    Ok(())
}

async fn run_research(
    config: &LlmKitConfig,
    query: &str,
    depth: usize,
    queries: usize,
    domains: Vec<String>,
    model: Option<String>,
    no_save: bool,
) -> CliResult<()> {
    require_llm_key(config)?;
    let model = model.unwrap_or_else(|| config.research_model.clone());
    let mut research = ResearchConfig::default()
        .with_depth(depth)
        .with_queries_per_depth(queries);
    if !domains.is_empty() {
        research = research.with_domains(domains);
    }

    let console = Arc::new(Console::new(false, false));
    let mut runner = ResearchRunner::new(Arc::new(config.llm_client(&model)), Arc::new(config.exa_client()))
        .with_config(research)
        .with_event_handler(console.clone());
    if !no_save {
        runner = runner.with_store(ResearchStore::new(&config.research_dir));
    }

    let report = runner.run(query, console.as_ref()).await?;
    println!("\n{}", report.to_markdown());
    Ok(())
}

fn run_research_list(config: &LlmKitConfig, limit: usize, show: Option<String>) -> CliResult<()> {
    let store = ResearchStore::new(&config.research_dir);
    if let Some(filename) = show {
        let (query, steps) = store.load(&filename)?;
        println!("{}", render_markdown(&query, &steps));
        return Ok(());
    }
    let names = store.list(limit)?;
    if names.is_empty() {
        println!("No saved research in {}", config.research_dir.display());
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

async fn run_commit_msg(config: &LlmKitConfig, all: bool, commit: bool, push: bool, model: Option<String>) -> CliResult<()> {
    let model = model.unwrap_or_else(|| config.chat_model.clone());
    let assistant = CommitAssistant::new(Arc::new(config.llm_client(&model)), GitRunner::new());

    let (status, diff) = match assistant.inspect(all).await? {
        TreeState::Clean => {
            println!("✨ Working tree clean, nothing to commit");
            return Ok(());
        }
        TreeState::NothingToCommit => {
            println!("✨ No changes to commit");
            return Ok(());
        }
        TreeState::Staged { status, diff } => (status, diff),
    };
    println!("📋 Current changes:\n{}\n{}\n{}\n", rule('-'), status, rule('-'));

    require_llm_key(config)?;
    println!("🤖 Generating commit message...");
    let message = assistant.generate(&diff).await?;
    println!("\n{}\n📝 Commit message:\n{}\n\n{}\n\n{}", rule('='), rule('='), message.bold(), rule('='));

    if !commit {
        println!("\n💡 Copy this command to commit:\n\n{}", suggested_command(&message));
        return Ok(());
    }

    print!("\nCommit? [Y/n]: ");
    io::stdout().flush()?;
    if !is_confirmed(read_line()?.as_deref()) {
        println!("Commit cancelled");
        return Ok(());
    }
    match assistant.commit(&message).await {
        Ok(stdout) => {
            println!("{}\n{}", "✅ Committed".green(), stdout);
            if push {
                println!("🚀 Pushing...");
                match assistant.push().await {
                    Ok(_) => println!("{}", "✅ Pushed".green()),
                    Err(e) => println!("{} {}", "❌ Push failed:".red(), e),
                }
            }
        }
        Err(e) => println!("{} {}", "❌ Commit failed:".red(), e),
    }
    Ok(())
}

async fn run_review(config: &LlmKitConfig, path: &str, output: &Path, model: Option<String>) -> CliResult<()> {
    require_llm_key(config)?;
    let model = model.unwrap_or_else(|| config.chat_model.clone());
    println!("📂 Input: {}\n🤖 Model: {}\n📝 Output: {}\n", path, model, output.display());

    let source = CodebaseSource::resolve(path, &GitRunner::new()).await?;
    let code = read_for_review(source.path())?;

    println!("{}\n🔍 Reviewing...\n{}\n", rule('='), rule('='));
    let reviewer = CodeReviewer::new(Arc::new(config.llm_client(&model)));
    reviewer.review_to_file(&code, output, &Console::new(true, false)).await?;
    println!("\n\n{}\n✅ Review saved to {}\n{}", rule('='), output.display(), rule('='));
    Ok(())
}

async fn run_merge_context(source: &str, output: &Path) -> CliResult<()> {
    let source = CodebaseSource::resolve(source, &GitRunner::new()).await?;
    let count = merge_to_file(source.path(), output)?;
    println!("✅ Merged {} files into {}", count, output.display());
    Ok(())
}

async fn run_daily_news(config: &LlmKitConfig, model: Option<String>, output_dir: Option<PathBuf>) -> CliResult<()> {
    require_llm_key(config)?;
    let model = model.unwrap_or_else(|| config.chat_model.clone());
    let dir = output_dir.unwrap_or_else(|| config.news_dir.clone());
    let digest = DailyDigest::new(Arc::new(config.llm_client(&model)), dir);
    match digest.run(Local::now().date_naive(), &Console::new(true, false)).await? {
        Some(path) => println!("\n✅ Report saved to {}", path.display()),
        None => println!("😴 Nothing newsworthy today."),
    }
    Ok(())
}

async fn run_translate(
    config: &LlmKitConfig,
    from: &str,
    to: &str,
    text: Option<String>,
    model: &str,
    ollama_url: Option<String>,
) -> CliResult<()> {
    let source = Language::lookup(from)?;
    let target = Language::lookup(to)?;
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let base = ollama_url.unwrap_or_else(|| config.ollama_base_url.clone());
    let translator = Translator::new(Arc::new(OllamaClient::with_base_url(model, &base)));
    eprintln!("{}", format!("Translating {} -> {}", source.code, target.code).dimmed());
    println!("{}", translator.translate(source, target, &text).await?);
    Ok(())
}

fn chat_client(config: &LlmKitConfig, model: Option<String>) -> CliResult<Arc<dyn ClientWrapper>> {
    if !config.gemini_api_key.trim().is_empty() {
        let model = model.unwrap_or_else(|| config.gemini_model.clone());
        return Ok(Arc::new(OpenAICompatibleClient::gemini(&config.gemini_api_key, &model)));
    }
    require_llm_key(config)?;
    let model = model.unwrap_or_else(|| config.chat_model.clone());
    Ok(Arc::new(config.llm_client(&model)))
}

async fn run_chat(
    config: &LlmKitConfig,
    resume: Option<String>,
    list: bool,
    delete: Option<String>,
    attach: Vec<PathBuf>,
    model: Option<String>,
) -> CliResult<()> {
    let store = ConversationStore::new(&config.chat_history_dir);
    if list {
        for name in store.list()? {
            println!("{}", name);
        }
        return Ok(());
    }
    if let Some(name) = delete {
        store.delete(&name)?;
        println!("Deleted {}", name);
        return Ok(());
    }

    let client = chat_client(config, model.clone())?;
    let mut conversation = match resume {
        Some(name) => Conversation::open(client, store, &name)?,
        None => Conversation::new(client, store),
    };
    for message in conversation.messages() {
        let who = match message.role {
            Role::User => "You:".yellow().bold(),
            _ => "AI:".cyan().bold(),
        };
        println!("{} {}", who, normalize_latex(&message.content.as_text()));
    }

    let mut pending: Vec<ContentPart> = Vec::new();
    for path in &attach {
        pending.push(attachment_from_file(path)?);
    }
    println!("{}", "Commands: /attach <file>, /new, /exit".dimmed());

    let console = Console::new(true, true);
    loop {
        print!("{} ", "You:".yellow().bold());
        io::stdout().flush()?;
        let line = match ChatInput::parse(read_line()?) {
            ChatInput::Exit => {
                println!();
                break;
            }
            ChatInput::Attach(path) => {
                match attachment_from_file(Path::new(&path)) {
                    Ok(part) => {
                        pending.push(part);
                        println!("{}", format!("{} attachment(s) queued", pending.len()).dimmed());
                    }
                    Err(e) => println!("{} {}", "⚠".yellow(), e),
                }
                continue;
            }
            ChatInput::New => {
                let client = chat_client(config, model.clone())?;
                conversation = Conversation::new(client, ConversationStore::new(&config.chat_history_dir));
                continue;
            }
            ChatInput::Blank if pending.is_empty() => continue,
            ChatInput::Blank => String::new(),
            ChatInput::Text(text) => text,
        };

        print!("{} ", "AI:".cyan().bold());
        let reply = conversation
            .send(&line, std::mem::take(&mut pending), &console)
            .await?;
        if reply.content.as_text() == RESPONSE_FAILED {
            println!("{}", RESPONSE_FAILED.red());
        }
        println!();
        if let Some(name) = conversation.filename() {
            log::debug!("chat saved to {}", name);
        }
    }
    Ok(())
}

async fn run_pages2md(
    config: &LlmKitConfig,
    images_dir: &Path,
    output: &Path,
    vision_model: Option<String>,
    model: Option<String>,
    concurrency: usize,
) -> CliResult<()> {
    require_llm_key(config)?;
    let vision = vision_model.unwrap_or_else(|| config.vision_model.clone());
    let editor = model.unwrap_or_else(|| config.chat_model.clone());
    let converter = PageConverter::new(
        Arc::new(config.llm_client(&vision)),
        Arc::new(config.llm_client(&editor)),
    )
    .with_concurrency(concurrency);
    let path = converter
        .convert(images_dir, output, &Console::new(true, false))
        .await?;
    println!("\n[+] Saved to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Command::Research {
            log_dir: Some(dir), ..
        } => match init_file_logger(dir) {
            Ok(path) => eprintln!("{}", format!("Logging to {}", path.display()).dimmed()),
            Err(e) => {
                llmkit::init_logger();
                log::warn!("could not open log file in {}: {}", dir.display(), e);
            }
        },
        _ => llmkit::init_logger(),
    }

    let mut config = LlmKitConfig::from_env();
    if let Some(key) = cli.provider.api_key {
        config.llm_api_key = key;
    }
    if let Some(url) = cli.provider.base_url {
        config.llm_base_url = url;
    }
    if let Some(key) = cli.provider.exa_api_key {
        config.exa_api_key = key;
    }

    let result = match cli.command {
        Command::React {
            query,
            max_steps,
            model,
        } => run_react(&config, &query, max_steps, model).await,
        Command::Research {
            query,
            depth,
            queries,
            domains,
            model,
            output_dir,
            no_save,
            ..
        } => {
            if let Some(dir) = output_dir {
                config.research_dir = dir;
            }
            run_research(&config, &query, depth, queries, domains, model, no_save).await
        }
        Command::ResearchList {
            limit,
            show,
            output_dir,
        } => {
            if let Some(dir) = output_dir {
                config.research_dir = dir;
            }
            run_research_list(&config, limit, show)
        }
        Command::CommitMsg {
            all,
            commit,
            push,
            model,
        } => run_commit_msg(&config, all, commit, push, model).await,
        Command::Review {
            path,
            output,
            model,
        } => run_review(&config, &path, &output, model).await,
        Command::MergeContext { source, output } => run_merge_context(&source, &output).await,
        Command::DailyNews { model, output_dir } => run_daily_news(&config, model, output_dir).await,
        Command::Translate {
            from,
            to,
            text,
            model,
            ollama_url,
        } => run_translate(&config, &from, &to, text, &model, ollama_url).await,
        Command::Chat {
            resume,
            list,
            delete,
            attach,
            model,
            gemini_api_key,
        } => {
            if let Some(key) = gemini_api_key {
                config.gemini_api_key = key;
            }
            run_chat(&config, resume, list, delete, attach, model).await
        }
        Command::Pages2md {
            images_dir,
            output,
            vision_model,
            model,
            concurrency,
        } => run_pages2md(&config, &images_dir, &output, vision_model, model, concurrency).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "❌ Error:".red().bold(), e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_line_reports_closed_input() {
        let mut input = io::Cursor::new("  hello \n\n");
        assert_eq!(read_line_from(&mut input).unwrap(), Some("hello".to_string()));
        assert_eq!(read_line_from(&mut input).unwrap(), Some(String::new()));
        assert_eq!(read_line_from(&mut input).unwrap(), None);
    }

    #[test]
    fn test_closed_stdin_ends_chat_and_declines_commit() {
        let mut closed = io::Cursor::new("");
        let line = read_line_from(&mut closed).unwrap();
        assert!(!is_confirmed(line.as_deref()));
        assert_eq!(ChatInput::parse(line), ChatInput::Exit);
    }

    #[test]
    fn test_chat_client_keeps_model_override() {
        let config = LlmKitConfig {
            llm_api_key: "sk-test".into(),
            gemini_api_key: String::new(),
            ..Default::default()
        };
        let model = Some("Qwen/Qwen3-8B".to_string());
        // session start, then /new
        for _ in 0..2 {
            assert_eq!(chat_client(&config, model.clone()).unwrap().model_name(), "Qwen/Qwen3-8B");
        }
        assert_eq!(chat_client(&config, None).unwrap().model_name(), config.chat_model);
    }

    #[test]
    fn test_chat_input_commands() {
        let parse = |s: &str| ChatInput::parse(Some(s.to_string()));
        assert_eq!(parse("/quit"), ChatInput::Exit);
        assert_eq!(parse("/attach  notes.pdf "), ChatInput::Attach("notes.pdf".into()));
        assert_eq!(parse("/new"), ChatInput::New);
        assert_eq!(parse(""), ChatInput::Blank);
        assert_eq!(parse("hi"), ChatInput::Text("hi".into()));
    }
}
