//! Content and locale flags attached to each root block

use std::fmt;

/// Content flags describe how a block's files are used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContentFlags(pub u32);

impl ContentFlags {
    /// No special flags
    pub const NONE: u32 = 0x0000_0000;

    /// Windows platform
    pub const LOAD_ON_WINDOWS: u32 = 0x0008;

    /// macOS platform
    pub const LOAD_ON_MACOS: u32 = 0x0010;

    /// Low violence variant; never selected by lookups
    pub const LOW_VIOLENCE: u32 = 0x0080;

    /// Do not load
    pub const DO_NOT_LOAD: u32 = 0x0100;

    /// Update plugin
    pub const UPDATE_PLUGIN: u32 = 0x0800;

    /// Encrypted content
    pub const ENCRYPTED: u32 = 0x0800_0000;

    /// Block carries no name hashes
    pub const NO_NAME_HASH: u32 = 0x1000_0000;

    /// Uncommon resolution
    pub const UNCOMMON_RESOLUTION: u32 = 0x2000_0000;

    /// Bundled file
    pub const BUNDLE: u32 = 0x4000_0000;

    /// No compression applied
    pub const NO_COMPRESSION: u32 = 0x8000_0000;

    /// Create from raw value
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Raw value
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Check if flag is set
    pub const fn has(self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }
}

impl fmt::Display for ContentFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<u32> for ContentFlags {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

/// Locale flags select the game locales a block applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocaleFlags(pub u32);

impl LocaleFlags {
    /// All locales
    pub const ALL: u32 = 0xFFFF_FFFF;

    /// English (United States)
    pub const ENUS: u32 = 0x0000_0002;

    /// Korean
    pub const KOKR: u32 = 0x0000_0004;

    /// French
    pub const FRFR: u32 = 0x0000_0010;

    /// German
    pub const DEDE: u32 = 0x0000_0020;

    /// Chinese (simplified)
    pub const ZHCN: u32 = 0x0000_0040;

    /// Spanish (Spain)
    pub const ESES: u32 = 0x0000_0080;

    /// Chinese (traditional)
    pub const ZHTW: u32 = 0x0000_0100;

    /// English (Great Britain)
    pub const ENGB: u32 = 0x0000_0200;

    /// English (China)
    pub const ENCN: u32 = 0x0000_0400;

    /// English (Taiwan)
    pub const ENTW: u32 = 0x0000_0800;

    /// Spanish (Mexico)
    pub const ESMX: u32 = 0x0000_1000;

    /// Russian
    pub const RURU: u32 = 0x0000_2000;

    /// Portuguese (Brazil)
    pub const PTBR: u32 = 0x0000_4000;

    /// Italian
    pub const ITIT: u32 = 0x0000_8000;

    /// Portuguese (Portugal)
    pub const PTPT: u32 = 0x0001_0000;

    const CODES: [(&'static str, u32); 15] = [
        ("enUS", Self::ENUS),
        ("koKR", Self::KOKR),
        ("frFR", Self::FRFR),
        ("deDE", Self::DEDE),
        ("zhCN", Self::ZHCN),
        ("esES", Self::ESES),
        ("zhTW", Self::ZHTW),
        ("enGB", Self::ENGB),
        ("enCN", Self::ENCN),
        ("enTW", Self::ENTW),
        ("esMX", Self::ESMX),
        ("ruRU", Self::RURU),
        ("ptBR", Self::PTBR),
        ("itIT", Self::ITIT),
        ("ptPT", Self::PTPT),
    ];

    /// Create from raw value
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Raw value
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Check if any of `locale` is set
    pub const fn has(self, locale: u32) -> bool {
        (self.0 & locale) != 0
    }

    /// Check if the two masks share any locale
    pub const fn matches(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Flag for a locale code such as `enUS` (case-insensitive)
    pub fn from_locale_code(code: &str) -> Option<Self> {
        Self::CODES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(code))
            .map(|&(_, value)| Self(value))
    }

    /// Locale code of a single-locale mask
    pub fn locale_code(self) -> Option<&'static str> {
        Self::CODES
            .iter()
            .find(|&&(_, value)| value == self.0)
            .map(|&(name, _)| name)
    }
}

impl Default for LocaleFlags {
    fn default() -> Self {
        Self(Self::ENUS)
    }
}

impl fmt::Display for LocaleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.locale_code() {
            Some(code) => f.write_str(code),
            None => write!(f, "0x{:08x}", self.0),
        }
    }
}

impl From<u32> for LocaleFlags {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl std::ops::BitOr for LocaleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}
