//! Reply payloads for the chatbot, in LINE Messaging API JSON.

use db::models::{location::Location, sweet::SweetListing};
use serde_json::{Value, json};

use crate::services::config::Config;

/// LINE caps a flex carousel at 12 bubbles.
pub const MAX_CAROUSEL_BUBBLES: usize = 12;
/// LINE caps quick replies at 13 items.
pub const MAX_QUICK_REPLIES: usize = 13;

pub const DEFAULT_IMAGE_URL: &str = "https://images.unsplash.com/photo-1492684223066-81342ee5ff30";
const TAG_ICON_URL: &str =
    "https://scdn.line-apps.com/n/channel_devcenter/img/fx/review_gold_star_28.png";
const ACCENT_COLOR: &str = "#FF5A8C";

/// Public URLs used to turn stored image paths into absolute ones.
#[derive(Debug, Clone, Default)]
pub struct ImageBase {
    pub base_url: Option<String>,
    pub liff_base_url: Option<String>,
    pub fallback_host: Option<String>,
}

impl ImageBase {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            liff_base_url: config.liff_base_url.clone(),
            fallback_host: config.allowed_hosts.first().cloned(),
        }
    }

    pub fn resolve(&self, image_url: &str) -> String {
        if image_url.is_empty() {
            return DEFAULT_IMAGE_URL.to_string();
        }
        if image_url.starts_with("http://") || image_url.starts_with("https://") {
            return image_url.to_string();
        }
        if image_url.starts_with('/') {
            return match self.liff_base_url.as_deref().or(self.base_url.as_deref()) {
                Some(base) => format!("{}{}", base.trim_end_matches('/'), image_url),
                None => format!(
                    "https://{}{}",
                    self.fallback_host.as_deref().unwrap_or("example.com"),
                    image_url
                ),
            };
        }
        match self.base_url.as_deref().or(self.liff_base_url.as_deref()) {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                image_url.trim_start_matches('/')
            ),
            None => image_url.to_string(),
        }
    }
}

fn text_message(text: &str) -> Value {
    json!({ "type": "text", "text": text })
}

pub fn default_message() -> Value {
    text_message("嗨，我是小夜的助理，歡迎你！可輸入「甜心列表」、「預約規則」或「客服」來開始互動唷。")
}

pub fn rules_message() -> Value {
    text_message(concat!(
        "✦ 預約小提醒\n",
        "- 先在 LINE 告訴小夜想預約的甜心、預計的時間和方案，小夜會幫你安排。\n",
        "- 預約確認後小夜會提供地點資訊，若有異動會第一時間通知你。\n",
        "- 需要更改或取消請盡早告知，方便小夜重新安排。\n",
        "- 請以官方帳號的訊息為準，千萬別先匯款給其他帳號。\n",
        "- 任何狀況都可以馬上回報小夜，讓小夜幫你處理♡"
    ))
}

pub fn customer_service_message() -> Value {
    text_message("👩‍💼 已轉接至真人客服，請稍候。\n若客服忙碌，可先留言你的需求與聯絡方式。")
}

pub fn location_menu(locations: &[Location]) -> Value {
    if locations.is_empty() {
        return text_message("目前尚未設定地區，可直接輸入「甜心列表 台北」等字樣查詢。");
    }
    let items: Vec<Value> = locations
        .iter()
        .take(MAX_QUICK_REPLIES)
        .map(|location| {
            json!({
                "type": "action",
                "action": {
                    "type": "message",
                    "label": location.name,
                    "text": format!("{}甜心", location.name),
                }
            })
        })
        .collect();
    json!({
        "type": "text",
        "text": "請選擇想看的地區：",
        "quickReply": { "items": items }
    })
}

pub fn sweet_carousel(sweets: &[SweetListing], title: Option<&str>, images: &ImageBase) -> Value {
    if sweets.is_empty() {
        return text_message("目前沒有上架的甜心，請稍後再試或聯絡客服唷。");
    }
    let bubbles: Vec<Value> = sweets
        .iter()
        .take(MAX_CAROUSEL_BUBBLES)
        .map(|sweet| sweet_bubble(sweet, images))
        .collect();
    json!({
        "type": "flex",
        "altText": title.unwrap_or("甜心列表"),
        "contents": { "type": "carousel", "contents": bubbles }
    })
}

pub fn sweet_bubble(sweet: &SweetListing, images: &ImageBase) -> Value {
    let booking_text = if sweet.code.is_empty() {
        format!("我想預約 {}", sweet.name)
    } else {
        format!("我想預約 {}({})", sweet.name, sweet.code)
    };
    json!({
        "type": "bubble",
        "hero": {
            "type": "image",
            "url": images.resolve(&sweet.image_url),
            "size": "full",
            "aspectRatio": "4:5",
            "aspectMode": "fit",
            "backgroundColor": "#f8f8f8"
        },
        "body": {
            "type": "box",
            "layout": "vertical",
            "spacing": "sm",
            "contents": body_contents(sweet)
        },
        "footer": {
            "type": "box",
            "layout": "vertical",
            "contents": [{
                "type": "button",
                "action": { "type": "message", "label": "預約", "text": booking_text },
                "style": "primary",
                "color": ACCENT_COLOR
            }]
        }
    })
}

fn body_contents(sweet: &SweetListing) -> Vec<Value> {
    let mut contents = Vec::new();

    let title = if sweet.code.is_empty() {
        sweet.name.clone()
    } else {
        format!("{} · {}", sweet.name, sweet.code)
    };
    contents.push(json!({
        "type": "text", "text": title, "weight": "bold", "size": "lg", "wrap": true
    }));

    if let Some(location) = &sweet.location {
        contents.push(json!({
            "type": "text",
            "text": format!("📍 {}", location.name),
            "size": "xs",
            "color": "#8C8C8C"
        }));
    }

    let rows: Vec<(&str, Option<String>)> = vec![
        ("環境", non_empty(&sweet.environment)),
        ("類型", non_empty(&sweet.service_type)),
        (
            "長鍾",
            duration_price(sweet.long_duration_minutes, sweet.long_price),
        ),
        (
            "短鍾",
            duration_price(sweet.short_duration_minutes, sweet.short_price),
        ),
    ];
    let shown: Vec<(&str, String)> = rows
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| (label, v)))
        .collect();
    if !shown.is_empty() {
        contents.push(json!({
            "type": "box",
            "layout": "vertical",
            "spacing": "xs",
            "margin": "sm",
            "contents": shown.iter().map(|(label, value)| info_row(label, value)).collect::<Vec<_>>()
        }));
    }

    let description = sweet.description.trim();
    if !description.is_empty() && !repeats_rows(description, &shown) {
        contents.push(json!({
            "type": "text",
            "text": description,
            "wrap": true,
            "margin": "md",
            "size": "xs",
            "color": "#666666"
        }));
    }

    if !sweet.tag.is_empty() {
        contents.push(json!({
            "type": "box",
            "layout": "baseline",
            "margin": "sm",
            "contents": [
                { "type": "icon", "size": "sm", "url": TAG_ICON_URL },
                { "type": "text", "text": sweet.tag, "size": "xs", "color": ACCENT_COLOR, "margin": "xs" }
            ]
        }));
    }
    contents
}

/// Imported descriptions often restate every detail row; those are dropped.
fn repeats_rows(description: &str, rows: &[(&str, String)]) -> bool {
    if rows.is_empty() {
        return false;
    }
    // Profile text spells the duration rows either way.
    let normalized = description.replace('：', ":").replace('鐘', "鍾");
    rows.iter().all(|(label, _)| normalized.contains(label))
}

fn info_row(label: &str, value: &str) -> Value {
    json!({
        "type": "box",
        "layout": "baseline",
        "contents": [
            { "type": "text", "text": label, "size": "xs", "color": "#888888", "flex": 3 },
            { "type": "text", "text": value, "wrap": true, "size": "sm", "weight": "bold", "color": "#333333", "flex": 7 }
        ]
    })
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub fn duration_price(duration: Option<i64>, price: Option<i64>) -> Option<String> {
    match (duration, price) {
        (None, None) => None,
        (Some(minutes), Some(price)) => Some(format!("{minutes} 分鐘 / {price}")),
        (Some(minutes), None) => Some(format!("{minutes} 分鐘")),
        (None, Some(price)) => Some(price.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::models::{
        location::LocationSummary,
        sweet::{Sweet, SweetListing},
    };

    use super::*;

    fn listing(id: i64, image_url: &str) -> SweetListing {
        let now = Utc::now();
        SweetListing {
            sweet: Sweet {
                id,
                name: format!("甜心{id}"),
                description: "環境：套房\n喜歡聊天".to_string(),
                image_url: image_url.to_string(),
                tag: "高雄 定點".to_string(),
                environment: "套房".to_string(),
                service_type: String::new(),
                long_duration_minutes: Some(60),
                short_duration_minutes: None,
                long_price: Some(3000),
                short_price: None,
                update_time: None,
                location_id: Some(6),
                created_at: now,
                updated_at: now,
            },
            code: format!("KS{id:04}"),
            average_rating: 0.0,
            review_count: 0,
            location: Some(LocationSummary {
                id: 6,
                slug: "kaohsiung".to_string(),
                name: "高雄".to_string(),
            }),
        }
    }

    fn location(name: &str) -> Location {
        let now = Utc::now();
        Location {
            id: 1,
            slug: name.to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_resolve_image() {
        let with_liff = ImageBase {
            base_url: Some("https://api.example.com".to_string()),
            liff_base_url: Some("https://liff.example.com/".to_string()),
            fallback_host: None,
        };
        assert_eq!(with_liff.resolve(""), DEFAULT_IMAGE_URL);
        assert_eq!(
            with_liff.resolve("https://cdn.example.com/a.jpg"),
            "https://cdn.example.com/a.jpg"
        );
        assert_eq!(
            with_liff.resolve("/sweets/kaohsiung/a.jpg"),
            "https://liff.example.com/sweets/kaohsiung/a.jpg"
        );
        assert_eq!(
            with_liff.resolve("media/a.jpg"),
            "https://api.example.com/media/a.jpg"
        );

        let bare = ImageBase {
            fallback_host: Some("night.example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(bare.resolve("/a.jpg"), "https://night.example.com/a.jpg");
        assert_eq!(ImageBase::default().resolve("/a.jpg"), "https://example.com/a.jpg");
        assert_eq!(ImageBase::default().resolve("a.jpg"), "a.jpg");
    }

    #[test]
    fn test_carousel_limits_and_alt_text() {
        let sweets: Vec<SweetListing> = (1..=15).map(|id| listing(id, "")).collect();
        let message = sweet_carousel(&sweets, Some("高雄甜心"), &ImageBase::default());
        assert_eq!(message["type"], "flex");
        assert_eq!(message["altText"], "高雄甜心");
        let bubbles = message["contents"]["contents"].as_array().unwrap();
        assert_eq!(bubbles.len(), MAX_CAROUSEL_BUBBLES);
        assert_eq!(
            bubbles[0]["footer"]["contents"][0]["action"]["text"],
            "我想預約 甜心1(KS0001)"
        );

        let empty = sweet_carousel(&[], Some("高雄甜心"), &ImageBase::default());
        assert_eq!(empty["type"], "text");
    }

    #[test]
    fn test_bubble_body() {
        let bubble = sweet_bubble(&listing(7, "/sweets/kaohsiung/a.jpg"), &ImageBase::default());
        let body = bubble["body"]["contents"].as_array().unwrap();
        assert_eq!(body[0]["text"], "甜心7 · KS0007");
        assert_eq!(body[1]["text"], "📍 高雄");
        let rows = body[2]["contents"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["contents"][1]["text"], "60 分鐘 / 3000");
        // Description restates only some rows, so it is kept.
        assert_eq!(body[3]["text"], "環境：套房\n喜歡聊天");
        assert_eq!(body[4]["contents"][1]["text"], "高雄 定點");
    }

    #[test]
    fn test_duration_rows_use_clock_labels() {
        let mut sweet = listing(8, "");
        sweet.sweet.description = "環境：套房\n長鐘：60 分鐘".to_string();
        let bubble = sweet_bubble(&sweet, &ImageBase::default());
        let body = bubble["body"]["contents"].as_array().unwrap();
        let rows = body[2]["contents"].as_array().unwrap();
        assert_eq!(rows[0]["contents"][0]["text"], "環境");
        assert_eq!(rows[1]["contents"][0]["text"], "長鍾");
        // Every row is restated, so the description is hidden.
        assert_eq!(body[3]["contents"][1]["text"], "高雄 定點");
    }

    #[test]
    fn test_location_menu() {
        let locations: Vec<Location> = (0..20).map(|i| location(&format!("L{i}"))).collect();
        let menu = location_menu(&locations);
        let items = menu["quickReply"]["items"].as_array().unwrap();
        assert_eq!(items.len(), MAX_QUICK_REPLIES);
        assert_eq!(items[0]["action"]["text"], "L0甜心");

        let empty = location_menu(&[]);
        assert!(empty.get("quickReply").is_none());
    }

    #[test]
    fn test_duration_price() {
        assert_eq!(duration_price(None, None), None);
        assert_eq!(duration_price(Some(40), None).as_deref(), Some("40 分鐘"));
        assert_eq!(duration_price(None, Some(2500)).as_deref(), Some("2500"));
    }
}
