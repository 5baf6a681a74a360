#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Arabic,
    English,
    French,
    Spanish,
    German,
    Italian,
    Russian,
    Chinese,
    Japanese,
    Korean,
    Turkish,
    Portuguese,
    Hindi,
    Indonesian,
    Urdu,
    Persian,
    Hebrew,
    Thai,
    Vietnamese,
    Dutch,
    Polish,
    Swedish,
    Greek,
    Romanian,
    Hungarian,
    Czech,
    Danish,
    Finnish,
    Norwegian,
    Ukrainian,
    Malay,
    Tagalog,
    Swahili,
}

const ALL_LANGUAGES: [Language; 33] = [
    Language::Arabic,
    Language::English,
    Language::French,
    Language::Spanish,
    Language::German,
    Language::Italian,
    Language::Russian,
    Language::Chinese,
    Language::Japanese,
    Language::Korean,
    Language::Turkish,
    Language::Portuguese,
    Language::Hindi,
    Language::Indonesian,
    Language::Urdu,
    Language::Persian,
    Language::Hebrew,
    Language::Thai,
    Language::Vietnamese,
    Language::Dutch,
    Language::Polish,
    Language::Swedish,
    Language::Greek,
    Language::Romanian,
    Language::Hungarian,
    Language::Czech,
    Language::Danish,
    Language::Finnish,
    Language::Norwegian,
    Language::Ukrainian,
    Language::Malay,
    Language::Tagalog,
    Language::Swahili,
];

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Arabic => "ar",
            Language::English => "en",
            Language::French => "fr",
            Language::Spanish => "es",
            Language::German => "de",
            Language::Italian => "it",
            Language::Russian => "ru",
            Language::Chinese => "zh",
            Language::Japanese => "ja",
            Language::Korean => "ko",
            Language::Turkish => "tr",
            Language::Portuguese => "pt",
            Language::Hindi => "hi",
            Language::Indonesian => "id",
            Language::Urdu => "ur",
            Language::Persian => "fa",
            Language::Hebrew => "he",
            Language::Thai => "th",
            Language::Vietnamese => "vi",
            Language::Dutch => "nl",
            Language::Polish => "pl",
            Language::Swedish => "sv",
            Language::Greek => "el",
            Language::Romanian => "ro",
            Language::Hungarian => "hu",
            Language::Czech => "cs",
            Language::Danish => "da",
            Language::Finnish => "fi",
            Language::Norwegian => "no",
            Language::Ukrainian => "uk",
            Language::Malay => "ms",
            Language::Tagalog => "tl",
            Language::Swahili => "sw",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_lowercase();
        ALL_LANGUAGES.into_iter().find(|l| l.code() == code)
    }

    pub fn all() -> Vec<Language> {
        ALL_LANGUAGES.to_vec()
    }

    pub fn native_name(&self) -> &'static str {
        match self {
            Language::Arabic => "العربية",
            Language::English => "English",
            Language::French => "Français",
            Language::Spanish => "Español",
            Language::German => "Deutsch",
            Language::Italian => "Italiano",
            Language::Russian => "Русский",
            Language::Chinese => "中文",
            Language::Japanese => "日本語",
            Language::Korean => "한국어",
            Language::Turkish => "Türkçe",
            Language::Portuguese => "Português",
            Language::Hindi => "हिन्दी",
            Language::Indonesian => "Indonesia",
            Language::Urdu => "اردو",
            Language::Persian => "فارسی",
            Language::Hebrew => "עברית",
            Language::Thai => "ไทย",
            Language::Vietnamese => "Tiếng Việt",
            Language::Dutch => "Nederlands",
            Language::Polish => "Polski",
            Language::Swedish => "Svenska",
            Language::Greek => "Ελληνικά",
            Language::Romanian => "Română",
            Language::Hungarian => "Magyar",
            Language::Czech => "Čeština",
            Language::Danish => "Dansk",
            Language::Finnish => "Suomi",
            Language::Norwegian => "Norsk",
            Language::Ukrainian => "Українська",
            Language::Malay => "Melayu",
            Language::Tagalog => "Tagalog",
            Language::Swahili => "Kiswahili",
        }
    }

    pub fn greeting(&self) -> &'static str {
        match self {
            Language::Arabic => "مرحباً",
            Language::English => "Hello",
            Language::French => "Bonjour",
            Language::Spanish => "Hola",
            Language::German | Language::Dutch => "Hallo",
            Language::Italian => "Ciao",
            Language::Russian => "Привет",
            Language::Chinese => "你好",
            Language::Japanese => "こんにちは",
            Language::Korean => "안녕하세요",
            Language::Turkish => "Merhaba",
            Language::Portuguese => "Olá",
            Language::Hindi => "नमस्ते",
            Language::Indonesian | Language::Malay => "Halo",
            Language::Urdu | Language::Persian => "سلام",
            Language::Hebrew => "שלום",
            Language::Thai => "สวัสดี",
            Language::Vietnamese => "Xin chào",
            Language::Polish => "Cześć",
            Language::Swedish | Language::Danish => "Hej",
            Language::Greek => "Γεια",
            Language::Romanian => "Salut",
            Language::Hungarian => "Szia",
            Language::Czech => "Ahoj",
            Language::Finnish => "Moi",
            Language::Norwegian => "Hei",
            Language::Ukrainian => "Привіт",
            Language::Tagalog => "Kumusta",
            Language::Swahili => "Jambo",
        }
    }

    pub fn is_rtl(&self) -> bool {
        matches!(
            self,
            Language::Arabic | Language::Hebrew | Language::Persian | Language::Urdu
        )
    }

    /// Pick a language from a POSIX locale string such as `fr_FR.UTF-8`
    pub fn from_locale(locale: &str) -> Option<Self> {
        let prefix: String = locale
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        Self::from_code(&prefix)
    }

    /// Detect the UI language from the process environment, English when unknown
    pub fn detect() -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .filter(|value| !value.is_empty())
            .find_map(|value| Self::from_locale(&value))
            .unwrap_or(Language::English)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "system" => Some(Theme::System),
            _ => None,
        }
    }

    pub fn all() -> Vec<Theme> {
        vec![Theme::Light, Theme::Dark, Theme::System]
    }

    /// Resolve `System` using the terminal's `COLORFGBG` hint ("fg;bg").
    /// A background colour index of 7 or 15 means a light terminal.
    pub fn resolve(&self, colorfgbg: Option<&str>) -> Theme {
        match self {
            Theme::System => {
                let light = colorfgbg
                    .and_then(|v| v.rsplit(';').next())
                    .and_then(|bg| bg.parse::<u8>().ok())
                    .map(|bg| bg == 7 || bg == 15)
                    .unwrap_or(false);
                if light {
                    Theme::Light
                } else {
                    Theme::Dark
                }
            }
            other => *other,
        }
    }
}
