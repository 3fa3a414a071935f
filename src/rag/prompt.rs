use once_cell::sync::Lazy;
use regex::Regex;

use crate::vectorstore::ScoredDocument;

/// Joins retrieved documents into the context block of the prompt.
pub fn format_context(docs: &[ScoredDocument]) -> String {
    docs.iter()
        .map(|doc| format!("📄 {}: {}", doc.title, doc.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the shop-assistant prompt sent to the language model.
pub fn build_prompt(query: &str, docs: &[ScoredDocument]) -> String {
    format!(
        r#"คุณคือผู้ช่วยของร้านกาแฟ "Coffee Corner" 🏪

กฎการตอบ:
- ตอบเป็นภาษาไทยและใส่อีโมจิ
- ใช้ข้อมูลที่ให้มาเท่านั้น
- ตอบสั้น เหมาะสำหรับ LINE chat
- ใส่ราคาชัดเจน
- ไม่ตอบเป็น markdown format

ข้อมูลร้าน:
{context}

คำถาม: {query}
ตอบ:"#,
        context = format_context(docs),
        query = query,
    )
}

static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\*\*|__)(.+?)(\*\*|__)").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s{0,3}#{1,6}\s+").unwrap());
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^(\s*)[*+]\s+").unwrap());

/// Removes markdown markup the model sometimes emits despite the prompt.
///
/// LINE shows messages as plain text, so `**bold**` would arrive with its asterisks.
pub fn strip_markdown(text: &str) -> String {
    let text = LINK.replace_all(text, "$1 ($2)");
    let text = EMPHASIS.replace_all(&text, "$2");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = BULLET.replace_all(&text, "$1- ");
    text.trim().to_string()
}
