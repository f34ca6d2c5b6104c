//! Multi-round deep research.
//!
//! A run works through `depth` levels. At each level the model proposes
//! search queries from the main question and the last few findings; every
//! query is searched, its sources analysed, and the analysis folded into a
//! running context. A final synthesis step writes the report, and the run is
//! saved as JSON through [`ResearchStore`].
//!
//! Progress is `completed / (depth × queries_per_depth + 1)` capped at 0.95
//! until synthesis starts (0.96) and finishes (1.0).

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::client_wrapper::{stream_chat, ChatOptions, ClientWrapper, Message, StreamSink};
use crate::event::{EventHandler, ResearchEvent};
use crate::json_extract::extract_json;
use crate::search::{SearchHit, SearchOptions, SearchProvider};
use crate::store::JsonStore;

pub type ResearchResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub const DEFAULT_DOMAINS: [&str; 5] = ["arxiv.org", "nature.com", "science.org", "ieee.org", "acm.org"];

/// Label of the synthesis step.
pub const SYNTHESIS_QUERY: &str = "最终综合分析";

const CONTEXT_STEPS: usize = 3;
const CONTEXT_ANALYSIS_CHARS: usize = 200;
const RUNNING_CONTEXT_CHARS: usize = 500;
const PROGRESS_CAP: f32 = 0.95;
const SYNTHESIS_PROGRESS: f32 = 0.96;

#[derive(Debug, Clone, PartialEq)]
pub struct ResearchConfig {
    /// Rounds of query generation, 1 to 5.
    pub depth: usize,
    /// Queries requested per round.
    pub queries_per_depth: usize,
    pub include_domains: Vec<String>,
    /// Token limit for query generation.
    pub query_max_tokens: u32,
    /// Token limit for analysis and synthesis.
    pub analysis_max_tokens: u32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            depth: 3,
            queries_per_depth: 5,
            include_domains: DEFAULT_DOMAINS.iter().map(|d| d.to_string()).collect(),
            query_max_tokens: 1024,
            analysis_max_tokens: 163_840,
        }
    }
}

impl ResearchConfig {
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth.max(1).min(5);
        self
    }

    pub fn with_queries_per_depth(mut self, n: usize) -> Self {
        self.queries_per_depth = n.max(1);
        self
    }

    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.include_domains = domains;
        self
    }

    /// Planned step count including the synthesis step.
    pub fn total_steps(&self) -> usize {
        self.depth * self.queries_per_depth + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    SearchAnalysis,
    Synthesis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchStep {
    pub query: String,
    pub step_type: StepType,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub sources: Vec<SearchHit>,
    #[serde(default = "now_iso")]
    pub timestamp: String,
}

fn now_iso() -> String {
    Local::now().to_rfc3339()
}

impl ResearchStep {
    pub fn new(
        query: impl Into<String>,
        step_type: StepType,
        sources: Vec<SearchHit>,
        analysis: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            step_type,
            analysis: analysis.into(),
            reasoning: reasoning.into(),
            sources,
            timestamp: now_iso(),
        }
    }
}

/// Persisted form of a run. Only `query` and `steps` are required on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRecord {
    pub query: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub steps: Vec<ResearchStep>,
}

/// Saved research runs in one directory.
#[derive(Debug, Clone)]
pub struct ResearchStore {
    store: JsonStore,
}

impl ResearchStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(dir),
        }
    }

    /// `%m%d_%H%M_research.json` for `now`.
    pub fn default_filename<Tz: TimeZone>(now: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        format!("{}_research.json", now.format("%m%d_%H%M"))
    }

    pub fn save(&self, filename: &str, query: &str, steps: &[ResearchStep]) -> ResearchResult<PathBuf> {
        self.save_record(
            filename,
            &ResearchRecord {
                query: query.to_string(),
                timestamp: now_iso(),
                session_id: None,
                steps: steps.to_vec(),
            },
        )
    }

    pub fn save_record(&self, filename: &str, record: &ResearchRecord) -> ResearchResult<PathBuf> {
        log::info!("ResearchStore::save: {}", filename);
        self.store.write(filename, record)
    }

    pub fn load(&self, filename: &str) -> ResearchResult<(String, Vec<ResearchStep>)> {
        let record = self.load_record(filename)?;
        Ok((record.query, record.steps))
    }

    pub fn load_record(&self, filename: &str) -> ResearchResult<ResearchRecord> {
        self.store.read(filename)
    }

    /// Newest `limit` saved runs.
    pub fn list(&self, limit: usize) -> ResearchResult<Vec<String>> {
        let mut names = self.store.list(false)?;
        names.truncate(limit);
        Ok(names)
    }
}

/// Completed run.
#[derive(Debug, Clone)]
pub struct ResearchReport {
    /// Random v4 id tagging this run's log lines.
    pub session_id: String,
    pub query: String,
    pub steps: Vec<ResearchStep>,
    /// Set when the run was saved.
    pub filename: Option<String>,
    pub elapsed_secs: f64,
}

impl ResearchReport {
    pub fn synthesis(&self) -> Option<&ResearchStep> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.step_type == StepType::Synthesis)
    }

    pub fn to_markdown(&self) -> String {
        render_markdown(&self.query, &self.steps)
    }
}

/// Query-generation prompt.
pub fn build_query_prompt(
    main_query: &str,
    existing: &[ResearchStep],
    depth_level: usize,
    depth: usize,
    count: usize,
) -> String {
    let mut context = String::new();
    if !existing.is_empty() {
        context.push_str("\n已完成的研究步骤：\n");
        let start = existing.len().saturating_sub(CONTEXT_STEPS);
        for (i, step) in existing[start..].iter().enumerate() {
            let head: String = step.analysis.chars().take(CONTEXT_ANALYSIS_CHARS).collect();
            context.push_str(&format!("{}. {} -> {}...\n", i + 1, step.query, head));
        }
    }
    let example: Vec<String> = (1..=count).map(|i| format!("\"查询{}\"", i)).collect();
    format!(
        "\n你是一个专业的研究助手。基于主要研究问题和已有进展，生成{count}个深入的搜索查询。\n\n\
         主要研究问题：{main}\n当前深度级别：{level}/{depth}\n{context}\n\
         请生成{count}个不同角度的搜索查询，每个查询应该：\n\
         1. 针对问题的不同方面\n2. 避免重复已搜索的内容\n3. 逐步深入细节\n4. 包含最新信息和趋势\n\n\
         请以JSON格式返回：\n{{\"queries\": [{example}]}}\n",
        count = count,
        main = main_query,
        level = depth_level,
        depth = depth,
        context = context,
        example = example.join(", "),
    )
}

/// Source-analysis prompt.
pub fn build_analysis_prompt(query: &str, sources: &[SearchHit], existing_context: &str) -> String {
    let mut sources_text = String::new();
    for (i, source) in sources.iter().enumerate() {
        sources_text.push_str(&format!("\n--- 来源 {} ---\n", i + 1));
        sources_text.push_str(&format!("标题: {}\n", source.title));
        sources_text.push_str(&format!("链接: {}\n", source.url));
        sources_text.push_str(&format!("内容: {}\n", source.content));
        if !source.highlights.is_empty() {
            sources_text.push_str(&format!("重点: {}\n", source.highlights.join("; ")));
        }
    }
    format!(
        "\n你是一个专业的研究分析师。请深入分析以下搜索结果，针对查询问题提供详细的分析。\n\n\
         查询问题：{}\n\n已有研究背景：\n{}\n\n搜索结果：\n{}\n\n\
         请提供：\n1. 关键发现和洞察\n2. 不同来源间的关联和对比\n3. 潜在的研究方向\n\
         4. 需要进一步探索的问题\n5. 基于证据的结论\n\n请结构化输出，使用markdown格式。\n",
        query, existing_context, sources_text
    )
}

/// Final synthesis prompt.
pub fn build_synthesis_prompt(main_query: &str, steps: &[ResearchStep]) -> String {
    let mut summary = String::new();
    for step in steps {
        let kind = match step.step_type {
            StepType::SearchAnalysis => "search_analysis",
            StepType::Synthesis => "synthesis",
        };
        summary.push_str(&format!("\n=== {} ===\n", step.query));
        summary.push_str(&format!("类型: {}\n", kind));
        summary.push_str(&format!("分析: {}\n", step.analysis));
        summary.push_str(&format!("来源数量: {}\n\n", step.sources.len()));
    }
    format!(
        "\n你是一个顶级研究专家。请基于以下完整的深度研究结果，为主要研究问题提供comprehensive final report。\n\n\
         主要研究问题：{}\n\n完整研究过程：\n{}\n\n请提供一份专业的研究报告，包括：\n\n\
         ## 执行摘要\n- 核心发现\n- 主要结论\n\n\
         ## 详细分析\n- 关键洞察\n- 趋势分析\n- 技术细节\n\n\
         ## 实践建议\n- 可行的解决方案\n- 实施建议\n- 潜在风险\n\n\
         ## 进一步研究方向\n- 未解决的问题\n- 研究空白\n- 未来机会\n\n\
         ## 参考文献总结\n- 关键文献分类\n- 可信度评估\n\n\
         请使用专业的学术语言，确保逻辑清晰、结构完整。\n",
        main_query, summary
    )
}

/// Pull `queries` out of a model reply; `None` when absent or empty.
pub fn parse_queries(reply: &str) -> Option<Vec<String>> {
    let value = extract_json(reply)?;
    let queries: Vec<String> = value
        .get("queries")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect();
    if queries.is_empty() {
        None
    } else {
        Some(queries)
    }
}

/// Markdown report: synthesis first, then each search step with its sources.
pub fn render_markdown(query: &str, steps: &[ResearchStep]) -> String {
    let mut out = format!("# 研究问题\n\n{}\n\n", query);

    if let Some(synthesis) = steps.iter().rev().find(|s| s.step_type == StepType::Synthesis) {
        out.push_str("# 综合研究报告\n\n");
        if !synthesis.reasoning.is_empty() {
            out.push_str("<details>\n<summary>推理过程</summary>\n\n");
            out.push_str(&synthesis.reasoning);
            out.push_str("\n\n</details>\n\n");
        }
        out.push_str(&synthesis.analysis);
        out.push_str("\n\n");
    }

    out.push_str("# 详细研究过程\n\n");
    let search_steps = steps.iter().filter(|s| s.step_type == StepType::SearchAnalysis);
    for (i, step) in search_steps.enumerate() {
        out.push_str(&format!("## 步骤 {}: {}\n\n", i + 1, step.query));
        out.push_str(&step.analysis);
        out.push_str("\n\n");
        if !step.sources.is_empty() {
            out.push_str("**参考来源:**\n\n");
            for (j, source) in step.sources.iter().enumerate() {
                out.push_str(&format!("{}. [{}]({})", j + 1, source.title, source.url));
                if source.score > 0.0 {
                    out.push_str(&format!(" (相关度: {:.2})", source.score));
                }
                out.push('\n');
            }
            out.push('\n');
        }
    }
    out
}

/// Runs deep research with one model and one search provider.
pub struct ResearchRunner {
    client: Arc<dyn ClientWrapper>,
    search: Arc<dyn SearchProvider>,
    config: ResearchConfig,
    store: Option<ResearchStore>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl ResearchRunner {
    pub fn new(client: Arc<dyn ClientWrapper>, search: Arc<dyn SearchProvider>) -> Self {
        Self {
            client,
            search,
            config: ResearchConfig::default(),
            store: None,
            event_handler: None,
        }
    }

    pub fn with_config(mut self, config: ResearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Save finished runs into `store`.
    pub fn with_store(mut self, store: ResearchStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    async fn emit(&self, event: ResearchEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_research_event(&event).await;
        }
    }

    /// Ask the model for the next queries; any failure yields `[main_query]`.
    pub async fn generate_search_queries(
        &self,
        main_query: &str,
        existing: &[ResearchStep],
        depth_level: usize,
    ) -> Vec<String> {
        log::info!(
            "generate_search_queries: level {}/{} for {}",
            depth_level,
            self.config.depth,
            main_query.chars().take(100).collect::<String>()
        );
        let prompt = build_query_prompt(
            main_query,
            existing,
            depth_level,
            self.config.depth,
            self.config.queries_per_depth,
        );
        let options = ChatOptions::new()
            .with_temperature(0.6)
            .with_max_tokens(self.config.query_max_tokens);

        match self.client.send_message(&[Message::user(prompt)], &options).await {
            Ok(response) => match parse_queries(response.content.trim()) {
                Some(queries) => {
                    log::info!("generate_search_queries: {} queries: {:?}", queries.len(), queries);
                    queries
                }
                None => {
                    log::warn!("generate_search_queries: no queries in reply, using main query");
                    vec![main_query.to_string()]
                }
            },
            Err(err) => {
                log::error!("generate_search_queries failed: {}", err);
                vec![main_query.to_string()]
            }
        }
    }

    /// Search one query; failures give an empty source list.
    pub async fn search_sources(&self, query: &str) -> Vec<SearchHit> {
        let options = SearchOptions::for_research(&self.config.include_domains);
        match self.search.search(query, &options).await {
            Ok(hits) => {
                log::info!("search_sources: {} sources for {}", hits.len(), query);
                hits
            }
            Err(err) => {
                log::error!("search_sources failed for {}: {}", query, err);
                Vec::new()
            }
        }
    }

    /// Stream an analysis of `sources`; returns `(analysis, reasoning)`.
    pub async fn analyze_sources(
        &self,
        query: &str,
        sources: &[SearchHit],
        existing_context: &str,
        sink: &dyn StreamSink,
    ) -> (String, String) {
        log::info!("analyze_sources: {} sources for {}", sources.len(), query);
        let prompt = build_analysis_prompt(query, sources, existing_context);
        let options = ChatOptions::new()
            .with_temperature(0.3)
            .with_max_tokens(self.config.analysis_max_tokens);
        match stream_chat(self.client.as_ref(), &[Message::user(prompt)], &options, sink).await {
            Ok(response) => {
                log::info!("analyze_sources: {} chars", response.content.chars().count());
                (response.content, response.reasoning)
            }
            Err(err) => {
                log::error!("analyze_sources failed: {}", err);
                (format!("分析失败: {}", err), String::new())
            }
        }
    }

    /// Stream the final report; returns `(synthesis, reasoning)`.
    pub async fn synthesize(
        &self,
        main_query: &str,
        steps: &[ResearchStep],
        sink: &dyn StreamSink,
    ) -> (String, String) {
        log::info!("synthesize: {} steps", steps.len());
        let prompt = build_synthesis_prompt(main_query, steps);
        let options = ChatOptions::new()
            .with_temperature(0.2)
            .with_max_tokens(self.config.analysis_max_tokens);
        match stream_chat(self.client.as_ref(), &[Message::user(prompt)], &options, sink).await {
            Ok(response) => (response.content, response.reasoning),
            Err(err) => {
                log::error!("synthesize failed: {}", err);
                (format!("综合分析失败: {}", err), String::new())
            }
        }
    }

    /// Run every level, synthesise, and save when a store is configured.
    pub async fn run(&self, query: &str, sink: &dyn StreamSink) -> ResearchResult<ResearchReport> {
        let start = Instant::now();
        let session_id = Uuid::new_v4().to_string();
        let total = self.config.total_steps();
        log::info!(
            "ResearchRunner::run[{}]: depth {} x {} queries + 1 synthesis = {} steps: {}",
            session_id,
            self.config.depth,
            self.config.queries_per_depth,
            total,
            query
        );
        self.emit(ResearchEvent::Started {
            query: query.to_string(),
            depth: self.config.depth,
            total_steps: total,
        })
        .await;

        let mut steps: Vec<ResearchStep> = Vec::new();
        let mut context = String::new();
        let mut completed = 0;

        for level in 1..=self.config.depth {
            self.emit(ResearchEvent::DepthStarted { level }).await;
            let queries = self.generate_search_queries(query, &steps, level).await;
            self.emit(ResearchEvent::QueriesGenerated {
                level,
                queries: queries.clone(),
            })
            .await;

            for q in queries {
                let sources = self.search_sources(&q).await;
                self.emit(ResearchEvent::SearchCompleted {
                    query: q.clone(),
                    source_count: sources.len(),
                })
                .await;

                let (analysis, reasoning) = self.analyze_sources(&q, &sources, &context, sink).await;

                completed += 1;
                let progress = progress_value(completed, total);
                log::info!("ResearchRunner::run: step {}/{} progress {:.3}", completed, total, progress);

                let head: String = analysis.chars().take(RUNNING_CONTEXT_CHARS).collect();
                context.push_str(&format!("\n{}: {}...\n", q, head));
                steps.push(ResearchStep::new(
                    q.clone(),
                    StepType::SearchAnalysis,
                    sources,
                    analysis,
                    reasoning,
                ));
                self.emit(ResearchEvent::StepCompleted {
                    query: q,
                    completed,
                    total,
                    progress,
                })
                .await;
            }
        }

        self.emit(ResearchEvent::SynthesisStarted {
            step_count: steps.len(),
            progress: SYNTHESIS_PROGRESS,
        })
        .await;
        let (synthesis, reasoning) = self.synthesize(query, &steps, sink).await;
        self.emit(ResearchEvent::SynthesisCompleted { progress: 1.0 }).await;
        steps.push(ResearchStep::new(
            SYNTHESIS_QUERY,
            StepType::Synthesis,
            Vec::new(),
            synthesis,
            reasoning,
        ));

        let filename = match &self.store {
            Some(store) => {
                let name = ResearchStore::default_filename(&Local::now());
                store.save_record(
                    &name,
                    &ResearchRecord {
                        query: query.to_string(),
                        timestamp: now_iso(),
                        session_id: Some(session_id.clone()),
                        steps: steps.clone(),
                    },
                )?;
                self.emit(ResearchEvent::Saved {
                    filename: name.clone(),
                })
                .await;
                Some(name)
            }
            None => None,
        };

        let elapsed_secs = start.elapsed().as_secs_f64();
        self.emit(ResearchEvent::Completed { elapsed_secs }).await;
        log::info!(
            "ResearchRunner::run[{}]: finished {} steps in {:.1}s",
            session_id,
            steps.len(),
            elapsed_secs
        );

        Ok(ResearchReport {
            session_id,
            query: query.to_string(),
            steps,
            filename,
            elapsed_secs,
        })
    }
}

/// `min(completed / total, 0.95)`.
pub fn progress_value(completed: usize, total: usize) -> f32 {
    if total == 0 {
        return PROGRESS_CAP;
    }
    (completed as f32 / total as f32).min(PROGRESS_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn step(query: &str, analysis: &str) -> ResearchStep {
        ResearchStep::new(query, StepType::SearchAnalysis, Vec::new(), analysis, "")
    }

    #[test]
    fn test_config_clamps_and_totals() {
        let config = ResearchConfig::default().with_depth(9).with_queries_per_depth(3);
        assert_eq!(config.depth, 5);
        assert_eq!(config.total_steps(), 16);
        assert_eq!(ResearchConfig::default().with_depth(0).depth, 1);
        assert_eq!(ResearchConfig::default().include_domains[0], "arxiv.org");
    }

    #[test]
    fn test_progress_is_capped() {
        assert!((progress_value(1, 4) - 0.25).abs() < 1e-6);
        assert!((progress_value(4, 4) - 0.95).abs() < 1e-6);
        assert!((progress_value(3, 0) - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_query_prompt_uses_last_three_steps() {
        let existing = vec![
            step("q1", "a1"),
            step("q2", "a2"),
            step("q3", &"x".repeat(300)),
            step("q4", "a4"),
        ];
        let prompt = build_query_prompt("main", &existing, 2, 3, 5);
        assert!(!prompt.contains("q1 ->"));
        assert!(prompt.contains("1. q2 -> a2..."));
        assert!(prompt.contains(&format!("2. q3 -> {}...", "x".repeat(200))));
        assert!(!prompt.contains(&"x".repeat(201)));
        assert!(prompt.contains("当前深度级别：2/3"));
        assert!(prompt.contains("\"查询5\""));
    }

    #[test]
    fn test_parse_queries() {
        assert_eq!(
            parse_queries("```json\n{\"queries\": [\"a\", \" \", \"b\"]}\n```"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(parse_queries("{\"queries\": []}"), None);
        assert_eq!(parse_queries("{\"other\": 1}"), None);
        assert_eq!(parse_queries("nonsense"), None);
    }

    #[test]
    fn test_step_type_serialization() {
        let json = serde_json::to_value(step("q", "a")).unwrap();
        assert_eq!(json["step_type"], "search_analysis");
        let parsed: ResearchStep =
            serde_json::from_str(r#"{"query": "q", "step_type": "synthesis"}"#).unwrap();
        assert_eq!(parsed.step_type, StepType::Synthesis);
        assert!(parsed.sources.is_empty());
        assert_eq!(parsed.analysis, "");
    }

    #[test]
    fn test_default_filename() {
        let at = Utc.with_ymd_and_hms(2025, 3, 7, 14, 5, 0).unwrap();
        assert_eq!(ResearchStore::default_filename(&at), "0307_1405_research.json");
    }

    #[test]
    fn test_store_round_trip_and_list() {
        let tmp = TempDir::new().unwrap();
        let store = ResearchStore::new(tmp.path());
        let steps = vec![
            step("q", "a"),
            ResearchStep::new(SYNTHESIS_QUERY, StepType::Synthesis, Vec::new(), "final", "why"),
        ];
        store.save("0101_0000_research.json", "主问题", &steps).unwrap();
        store.save("0202_0000_research.json", "second", &[]).unwrap();

        let (query, loaded) = store.load("0101_0000_research.json").unwrap();
        assert_eq!(query, "主问题");
        assert_eq!(loaded, steps);
        assert_eq!(store.list(1).unwrap(), vec!["0202_0000_research.json"]);
    }

    #[test]
    fn test_render_markdown() {
        let mut search = step("q1", "analysis one");
        search.sources = vec![SearchHit {
            title: "Paper".into(),
            url: "https://arxiv.org/abs/1".into(),
            score: 0.876,
            ..SearchHit::default()
        }];
        let synthesis =
            ResearchStep::new(SYNTHESIS_QUERY, StepType::Synthesis, Vec::new(), "final report", "trace");
        let md = render_markdown("main", &[search, synthesis]);
        assert!(md.starts_with("# 研究问题\n\nmain"));
        assert!(md.contains("<details>\n<summary>推理过程</summary>\n\ntrace"));
        assert!(md.contains("final report"));
        assert!(md.contains("## 步骤 1: q1"));
        assert!(md.contains("1. [Paper](https://arxiv.org/abs/1) (相关度: 0.88)"));
    }
}
