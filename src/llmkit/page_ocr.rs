//! Page images to Markdown.
//!
//! Every pre-rendered page image is transcribed by a vision model with at most
//! [`DEFAULT_CONCURRENCY`] requests in flight. Pages are joined in page order,
//! checkpointed to `raw.md`, then a text model stitches the pages into a clean
//! document. A failed page contributes an empty string; a failed refine pass
//! keeps the raw text.

use base64::Engine;
use futures_util::stream::{self, StreamExt};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::client_wrapper::{
    stream_chat, ChatOptions, ClientWrapper, ContentPart, Message, MessageContent, StreamSink,
};

pub type OcrResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const RAW_CHECKPOINT: &str = "raw.md";

pub const OCR_PROMPT: &str = "你是一个专业的学术文档转换助手。请将这张图片中的内容转换为标准的 Markdown 格式。要求：
1. 严格保留所有的数学公式，使用 LaTeX 格式（例如 $E=mc^2$）。
2. 保持标题层级（# ## ###）。
3. 即使图片中有页眉页脚，也请忽略它们，只提取正文。
4. 如果有表格，请还原为 Markdown 表格。
5. 不要输出任何闲聊，直接输出 Markdown 内容。";

pub const REFINE_SYSTEM_PROMPT: &str = "你是一个专业的科技文档编辑。";

pub const REFINE_PROMPT: &str = "以下是从 PDF 逐页 OCR 提取的 Markdown 文本，可能包含跨页断句、重复的页码或格式不一致。请你作为编辑，整理这篇文档：
1. 修复跨页导致的断句（将上一页未完的句子与下一页连接）。
2. 修正明显的 OCR 拼写错误（根据上下文）。
3. 统一数学公式的 LaTeX 格式风格。
4. 输出最终的、干净的 Markdown 全文。
5. 不要摘要，保留所有细节信息。";

#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    /// 1-based page number.
    pub number: usize,
    pub path: PathBuf,
    pub mime: &'static str,
}

fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Page images in `dir`, ordered by file name and numbered from 1.
pub fn list_page_images(dir: &Path) -> OcrResult<Vec<PageImage>> {
    let mut files: Vec<(PathBuf, &'static str)> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| image_mime(&path).map(|mime| (path, mime)))
        .collect();
    files.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));

    Ok(files
        .into_iter()
        .enumerate()
        .map(|(i, (path, mime))| PageImage {
            number: i + 1,
            path,
            mime,
        })
        .collect())
}

/// Ordered join of `(page, text)` pairs with blank lines.
pub fn join_pages(mut pages: Vec<(usize, String)>) -> String {
    pages.sort_by_key(|(number, _)| *number);
    pages
        .into_iter()
        .map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_page_request(page: &PageImage) -> OcrResult<Vec<Message>> {
    let data = base64::engine::general_purpose::STANDARD.encode(fs::read(&page.path)?);
    Ok(vec![Message::user(MessageContent::Parts(vec![
        ContentPart::text(OCR_PROMPT),
        ContentPart::image_base64(page.mime, &data),
    ]))])
}

pub struct PageConverter {
    vision: Arc<dyn ClientWrapper>,
    editor: Arc<dyn ClientWrapper>,
    concurrency: usize,
}

impl PageConverter {
    pub fn new(vision: Arc<dyn ClientWrapper>, editor: Arc<dyn ClientWrapper>) -> Self {
        Self {
            vision,
            editor,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Transcribe one page; failures are logged and yield an empty string.
    pub async fn ocr_page(&self, page: &PageImage) -> (usize, String) {
        let options = ChatOptions::new().with_temperature(0.1).with_max_tokens(16_384);
        let result = match build_page_request(page) {
            Ok(messages) => self.vision.send_message(&messages, &options).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(response) => {
                log::info!("PageConverter::ocr_page: page {} done", page.number);
                (page.number, response.content)
            }
            Err(err) => {
                log::error!("PageConverter::ocr_page: page {} failed: {}", page.number, err);
                (page.number, String::new())
            }
        }
    }

    /// Transcribe all pages with bounded concurrency; output is in page order.
    pub async fn ocr_pages(&self, pages: &[PageImage]) -> String {
        let results: Vec<(usize, String)> = stream::iter(pages)
            .map(|page| self.ocr_page(page))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        join_pages(results)
    }

    /// Stitch the raw pages into one document; returns `raw` on failure.
    pub async fn refine(&self, raw: &str, sink: &dyn StreamSink) -> String {
        let messages = [
            Message::system(REFINE_SYSTEM_PROMPT),
            Message::user(format!("{}\n\n---\n\n{}", REFINE_PROMPT, raw)),
        ];
        let options = ChatOptions::new().with_temperature(0.3);
        match stream_chat(self.editor.as_ref(), &messages, &options, sink).await {
            Ok(response) if !response.content.is_empty() => response.content,
            Ok(_) => {
                log::warn!("PageConverter::refine: empty reply, keeping raw text");
                raw.to_string()
            }
            Err(err) => {
                log::error!("PageConverter::refine: {}", err);
                raw.to_string()
            }
        }
    }

    /// Convert every page image in `dir` and write the result to `output`.
    ///
    /// The raw transcription is saved as `raw.md` next to `output` first.
    pub async fn convert(&self, dir: &Path, output: &Path, sink: &dyn StreamSink) -> OcrResult<PathBuf> {
        let pages = list_page_images(dir)?;
        if pages.is_empty() {
            return Err(format!("No page images (png/jpg/jpeg/webp) in {}", dir.display()).into());
        }
        log::info!("PageConverter::convert: {} pages from {}", pages.len(), dir.display());

        let raw = self.ocr_pages(&pages).await;
        let out_dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&out_dir)?;
        fs::write(out_dir.join(RAW_CHECKPOINT), &raw)?;

        let refined = self.refine(&raw, sink).await;
        fs::write(output, refined)?;
        Ok(output.to_path_buf())
    }
}
