//! Localized user-facing text.
//!
//! Only Arabic and English are translated; every other language falls back
//! to the English table.

use crate::language::Language;

#[derive(Debug)]
pub struct ChipStrings {
    pub restaurants: &'static str,
    pub hotels: &'static str,
    pub car_rental: &'static str,
    pub attractions: &'static str,
    pub plan: &'static str,
}

#[derive(Debug)]
pub struct MapStrings {
    pub searching: &'static str,
    found: &'static str,
    pub not_found: &'static str,
    pub your_location: &'static str,
    pub default_location: &'static str,
    pub details: &'static str,
}

impl MapStrings {
    /// "Found N places" with the count substituted
    pub fn found(&self, count: usize) -> String {
        self.found.replace("{}", &count.to_string())
    }
}

#[derive(Debug)]
pub struct Strings {
    pub app_title: &'static str,
    pub subtitle: &'static str,
    pub welcome: &'static str,
    pub input_placeholder: &'static str,
    pub chat_mode: &'static str,
    pub map_mode: &'static str,
    pub location_set: &'static str,
    pub location_disabled: &'static str,
    pub delete_chat: &'static str,
    pub settings: &'static str,
    pub language: &'static str,
    pub appearance: &'static str,
    pub theme_light: &'static str,
    pub theme_dark: &'static str,
    pub theme_system: &'static str,
    pub ads: &'static str,
    pub enable_ads: &'static str,
    pub ad_banner: &'static str,
    pub clear_data: &'static str,
    pub disclaimer: &'static str,
    pub place_unavailable: &'static str,
    pub empty_reply: &'static str,
    pub error: &'static str,
    pub chips: ChipStrings,
    pub prompts: ChipStrings,
    pub map: MapStrings,
}

static ENGLISH: Strings = Strings {
    app_title: "Moroccan Tour Guide",
    subtitle: "AI Travel Companion",
    welcome: "Welcome! I am \"Murshid\", your intelligent tour guide. 🌍\n\nHow can I help you today? I can suggest destinations, restaurants, hotels, or plan a full trip for you.",
    input_placeholder: "Ask about a destination, restaurant, or trip plan...",
    chat_mode: "Chat",
    map_mode: "Map",
    location_set: "Location Set",
    location_disabled: "Location Disabled",
    delete_chat: "Delete Chat",
    settings: "Settings",
    language: "Language",
    appearance: "Appearance",
    theme_light: "Light",
    theme_dark: "Dark",
    theme_system: "System",
    ads: "Ads",
    enable_ads: "Enable ads to support the app",
    ad_banner: "Best Hotel Deals - Up to 50% Off",
    clear_data: "Remove Data",
    disclaimer: "Murshid can make mistakes. Please verify important information.",
    place_unavailable: "Place name unavailable",
    empty_reply: "Sorry, I couldn't get information right now. Please try again.",
    error: "Sorry, an unexpected error occurred.",
    chips: ChipStrings {
        restaurants: "Food & Drink",
        hotels: "Hotels",
        car_rental: "Rent a Car",
        attractions: "Attractions",
        plan: "Daily Plan",
    },
    prompts: ChipStrings {
        restaurants: "Give me a list of the best local restaurants and cafes here with ratings, prices, and opening hours.",
        hotels: "Suggest distinct hotels here. Mention the price per night, star rating, amenities (like pool or breakfast), and proximity to landmarks.",
        car_rental: "Find reliable car rental agencies nearby. Include ratings, car types, and approximate daily prices.",
        attractions: "What are the top tourist attractions nearby?",
        plan: "Suggest a 1-day itinerary for a fun day here.",
    },
    map: MapStrings {
        searching: "Locating places on map...",
        found: "Found {} places",
        not_found: "No precise coordinates found",
        your_location: "Your Location",
        default_location: "Default Location",
        details: "Click for details in chat",
    },
};

static ARABIC: Strings = Strings {
    app_title: "Moroccan Tour Guide",
    subtitle: "الرفيق الذكي للسفر",
    welcome: "أهلاً بك! أنا \"مرشد\"، دليلك السياحي الذكي. 🌍\n\nكيف يمكنني مساعدتك اليوم؟ أستطيع اقتراح وجهات سياحية، مطاعم، فنادق، أو تخطيط رحلة كاملة لك.",
    input_placeholder: "اسأل عن وجهة، مطعم، أو خطة سياحية...",
    chat_mode: "محادثة",
    map_mode: "الخريطة",
    location_set: "تم تحديد موقعك",
    location_disabled: "الموقع غير مفعل",
    delete_chat: "حذف المحادثة",
    settings: "الإعدادات",
    language: "اللغة",
    appearance: "المظهر",
    theme_light: "فاتح",
    theme_dark: "داكن",
    theme_system: "تلقائي",
    ads: "الإعلانات",
    enable_ads: "تفعيل الإعلانات لدعم التطبيق",
    ad_banner: "أفضل عروض الفنادق - خصم حتى 50%",
    clear_data: "إزالة البيانات",
    disclaimer: "يمكن لمرشد ارتكاب الأخطاء. يرجى التحقق من المعلومات المهمة.",
    place_unavailable: "اسم المكان غير متوفر",
    empty_reply: "عذراً، لم أتمكن من الحصول على المعلومات الآن. يرجى المحاولة مرة أخرى.",
    error: "عذراً، حدث خطأ غير متوقع.",
    chips: ChipStrings {
        restaurants: "مطاعم ومقاهي",
        hotels: "فنادق وإقامة",
        car_rental: "كراء السيارات",
        attractions: "معالم سياحية",
        plan: "خطة يومية",
    },
    prompts: ChipStrings {
        restaurants: "أعطني قائمة بأفضل المطاعم والمقاهي المحلية هنا مع التقييمات، الأسعار، وساعات العمل.",
        hotels: "اقترح لي فنادق مميزة هنا. اذكر لي سعر الليلة بالعملة المحلية، عدد النجوم، المميزات (مثل مسبح أو إفطار)، وكم تبعد عن المعالم الرئيسية.",
        car_rental: "ابحث لي عن مكاتب كراء السيارات (تأجير سيارات) القريبة والموثوقة. اذكر التقييمات، أنواع السيارات المتوفرة، ومتوسط الأسعار اليومية.",
        attractions: "ما هي أبرز المعالم السياحية القريبة؟",
        plan: "اقترح لي خطة سياحية لقضاء يوم ممتع هنا.",
    },
    map: MapStrings {
        searching: "جاري تحديد المواقع على الخريطة...",
        found: "تم تحديد {} أماكن",
        not_found: "لم يتم العثور على إحداثيات دقيقة",
        your_location: "موقعك الحالي",
        default_location: "الموقع الافتراضي",
        details: "انقر للتفاصيل في المحادثة",
    },
};

pub fn strings(language: Language) -> &'static Strings {
    match language {
        Language::Arabic => &ARABIC,
        _ => &ENGLISH,
    }
}
