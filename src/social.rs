//! Social-media platform classification.
//!
//! Article captions credit the photo to an external page, usually a social
//! network profile. [`classify`] maps that caption text to one of the known
//! platforms by looking for each platform's domain fragment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platforms a photo credit can point at.
///
/// `Other` is the fallback for captions that match no known domain. It is
/// never a match target itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub enum SocialMedia {
    Instagram,
    Facebook,
    Vkontakte,
    #[default]
    Other,
}

/// Known platforms and the domain fragment that identifies them, in
/// declaration order.
const PLATFORM_TOKENS: [(SocialMedia, &str); 3] = [
    (SocialMedia::Instagram, "instagram.com"),
    (SocialMedia::Facebook, "facebook.com"),
    (SocialMedia::Vkontakte, "vk.com"),
];

/// Classify a caption or URL by substring containment.
///
/// Every entry of [`PLATFORM_TOKENS`] is tested and each match overwrites the
/// result, so when the text mentions several platforms the one declared last
/// wins regardless of where the fragments appear in the text.
///
/// NOTE: late-wins looks accidental rather than intended, but stored records
/// were produced this way and must stay reproducible.
pub fn classify(text: &str) -> SocialMedia {
    PLATFORM_TOKENS
        .iter()
        .fold(SocialMedia::Other, |found, (platform, token)| {
            if text.contains(token) { *platform } else { found }
        })
}

impl fmt::Display for SocialMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SocialMedia::Instagram => "instagram",
            SocialMedia::Facebook => "facebook",
            SocialMedia::Vkontakte => "vkontakte",
            SocialMedia::Other => "other",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_platforms() {
        assert_eq!(classify("https://www.instagram.com/someone/"), SocialMedia::Instagram);
        assert_eq!(classify("facebook.com/someone"), SocialMedia::Facebook);
        assert_eq!(classify("Фото: vk.com/id123"), SocialMedia::Vkontakte);
    }

    #[test]
    fn test_classify_unknown_is_other() {
        assert_eq!(classify("Legion-Media"), SocialMedia::Other);
        assert_eq!(classify(""), SocialMedia::Other);
        assert_eq!(classify("twitter.com/someone"), SocialMedia::Other);
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        assert_eq!(classify("Instagram.COM/someone"), SocialMedia::Other);
    }

    #[test]
    fn test_later_declared_platform_wins() {
        // Vkontakte is declared after Facebook, so it wins even though the
        // facebook fragment appears later in the text.
        let text = "vk.com/star and facebook.com/star";
        for _ in 0..3 {
            assert_eq!(classify(text), SocialMedia::Vkontakte);
        }
        assert_eq!(
            classify("facebook.com/a instagram.com/a"),
            SocialMedia::Facebook
        );
    }

    #[test]
    fn test_serialized_name() {
        let json = serde_json::to_string(&SocialMedia::Vkontakte).unwrap();
        assert_eq!(json, "\"Vkontakte\"");
        assert_eq!(SocialMedia::Instagram.to_string(), "instagram");
    }
}
