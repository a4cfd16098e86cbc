//! Localized user-facing messages for the login flow.

use serde::{Deserialize, Serialize};

/// Display language for validation and throttle messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Th,
}

impl Locale {
    /// Parses a language tag such as `th`, `th-TH` or `en_US`. Unknown tags fall back to English.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "th" => Locale::Th,
            _ => Locale::En,
        }
    }

    /// Picks the first supported language from an `Accept-Language` header value.
    ///
    /// Quality weights are ignored; the header order is taken as preference order.
    pub fn from_accept_language(header: &str) -> Option<Self> {
        header
            .split(',')
            .filter_map(|part| part.split(';').next())
            .map(str::trim)
            .find_map(|tag| {
                let lower = tag.to_ascii_lowercase();
                if lower.starts_with("th") {
                    Some(Locale::Th)
                } else if lower.starts_with("en") {
                    Some(Locale::En)
                } else {
                    None
                }
            })
    }

    pub fn identity_required(self) -> &'static str {
        match self {
            Locale::En => "The employee ID field is required.",
            Locale::Th => "กรุณากรอกรหัสพนักงาน",
        }
    }

    pub fn identity_digits(self) -> &'static str {
        match self {
            Locale::En => "The employee ID must be exactly 6 digits.",
            Locale::Th => "รหัสพนักงานต้องเป็นตัวเลข 6 หลัก",
        }
    }

    pub fn secret_required(self) -> &'static str {
        match self {
            Locale::En => "The password field is required.",
            Locale::Th => "กรุณากรอกรหัสผ่าน",
        }
    }

    pub fn secret_min(self, min: usize) -> String {
        match self {
            Locale::En => format!("The password must be at least {min} characters."),
            Locale::Th => format!("รหัสผ่านต้องมีอย่างน้อย {min} ตัวอักษร"),
        }
    }

    /// Generic rejection text. Never reveals whether the identity exists.
    pub fn failed(self) -> &'static str {
        match self {
            Locale::En => "These credentials do not match our records.",
            Locale::Th => "รหัสพนักงานหรือรหัสผ่านไม่ถูกต้อง",
        }
    }

    pub fn throttle(self, seconds: u64, minutes: u64) -> String {
        match self {
            Locale::En => format!(
                "Too many login attempts. Please try again in {seconds} seconds ({minutes} minutes)."
            ),
            Locale::Th => format!(
                "เข้าสู่ระบบผิดพลาดหลายครั้งเกินไป กรุณาลองใหม่ในอีก {seconds} วินาที ({minutes} นาที)"
            ),
        }
    }

    pub fn service_unavailable(self) -> &'static str {
        match self {
            Locale::En => "The authentication service is temporarily unavailable. Please try again.",
            Locale::Th => "ระบบยืนยันตัวตนไม่พร้อมใช้งานชั่วคราว กรุณาลองใหม่อีกครั้ง",
        }
    }

    pub fn invalid_fields(self) -> &'static str {
        match self {
            Locale::En => "The given data was invalid.",
            Locale::Th => "ข้อมูลที่ส่งมาไม่ถูกต้อง",
        }
    }
}
