use std::path::{Path, PathBuf};

use similar::TextDiff;

use super::{entries::normalize_text, ocr::ImageTextReader};

pub const NAME_MATCH_THRESHOLD: f32 = 0.6;
pub const OCR_MATCH_THRESHOLD: f32 = 0.45;

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn similarity(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}

/// Take the image for `name` out of `queue`: an exact file-name match, else the
/// closest file name, else (with OCR) the image whose text shows the name,
/// else the first image left.
pub async fn select_image(
    name: &str,
    queue: &mut Vec<PathBuf>,
    ocr: Option<&dyn ImageTextReader>,
) -> Option<PathBuf> {
    if queue.is_empty() {
        return None;
    }
    let target = normalize_text(name);

    if !target.is_empty() {
        if let Some(idx) = match_by_file_name(&target, queue) {
            return Some(queue.remove(idx));
        }
        if let Some(reader) = ocr {
            if let Some(idx) = match_by_ocr(&target, queue, reader).await {
                return Some(queue.remove(idx));
            }
        }
    }
    Some(queue.remove(0))
}

fn match_by_file_name(target: &str, queue: &[PathBuf]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, candidate) in queue.iter().enumerate() {
        let stem = candidate
            .file_stem()
            .map(|s| normalize_text(&s.to_string_lossy()))
            .unwrap_or_default();
        if stem.is_empty() {
            continue;
        }
        if stem == target {
            return Some(idx);
        }
        let score = similarity(target, &stem);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((idx, score));
        }
    }
    best.filter(|(_, score)| *score >= NAME_MATCH_THRESHOLD)
        .map(|(idx, _)| idx)
}

async fn match_by_ocr(
    target: &str,
    queue: &[PathBuf],
    reader: &dyn ImageTextReader,
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, candidate) in queue.iter().enumerate() {
        let Some(text) = reader.read_text(candidate).await else {
            continue;
        };
        let text = normalize_text(&text);
        if text.is_empty() {
            continue;
        }
        if text.contains(target) {
            return Some(idx);
        }
        let score = similarity(target, &text);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((idx, score));
        }
    }
    best.filter(|(_, score)| *score >= OCR_MATCH_THRESHOLD)
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;

    struct FixedText(HashMap<PathBuf, String>);

    #[async_trait]
    impl ImageTextReader for FixedText {
        async fn read_text(&self, image: &Path) -> Option<String> {
            self.0.get(image).cloned()
        }
    }

    fn queue(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("a.JPG")));
        assert!(is_image(Path::new("b.webp")));
        assert!(!is_image(Path::new("c.txt")));
        assert!(!is_image(Path::new("noext")));
    }

    #[tokio::test]
    async fn test_exact_then_similar_then_first() {
        let mut images = queue(&["a/001.jpg", "a/小晴 .png", "a/小雨2.jpg"]);

        let exact = select_image("小晴", &mut images, None).await;
        assert_eq!(exact, Some(PathBuf::from("a/小晴 .png")));

        let similar = select_image("小雨", &mut images, None).await;
        assert_eq!(similar, Some(PathBuf::from("a/小雨2.jpg")));

        let fallback = select_image("阿月", &mut images, None).await;
        assert_eq!(fallback, Some(PathBuf::from("a/001.jpg")));

        assert!(images.is_empty());
        assert_eq!(select_image("阿月", &mut images, None).await, None);
    }

    #[tokio::test]
    async fn test_ocr_match() {
        let mut images = queue(&["a/001.jpg", "a/002.jpg"]);
        let reader = FixedText(HashMap::from([
            (PathBuf::from("a/001.jpg"), "歡迎光臨".to_string()),
            (PathBuf::from("a/002.jpg"), "✦ 小晴 ✦ 新人".to_string()),
        ]));

        let chosen = select_image("小晴", &mut images, Some(&reader)).await;
        assert_eq!(chosen, Some(PathBuf::from("a/002.jpg")));
        assert_eq!(images, queue(&["a/001.jpg"]));
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert!(similarity("小雨", "小雨2") >= NAME_MATCH_THRESHOLD);
        assert!(similarity("小晴", "001") < NAME_MATCH_THRESHOLD);
    }
}
