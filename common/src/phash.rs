//! 知覚ハッシュ（pHash）の型定義
//!
//! 64bit固定長。画像処理そのものはCLI側（`image`クレート）で行い、
//! ここではビット列と距離計算のみを扱う。

use std::fmt;

/// 64bit知覚ハッシュ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerceptualHash(u64);

impl PerceptualHash {
    /// ハッシュのビット長
    pub const BITS: u32 = 64;

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// 行優先に並んだビット列から構築（先頭が最上位ビット）
    pub fn from_bools<I>(bools: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let bits = bools
            .into_iter()
            .take(Self::BITS as usize)
            .fold(0u64, |acc, b| (acc << 1) | u64::from(b));
        Self(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    pub fn bit_len(&self) -> u32 {
        Self::BITS
    }

    /// ハミング距離（異なるビット数）
    pub fn distance(&self, other: &PerceptualHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// 16進文字列から復元
    pub fn from_hex(hex: &str) -> Option<Self> {
        u64::from_str_radix(hex.trim(), 16).ok().map(Self)
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
