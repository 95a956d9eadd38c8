//! Cheap, synchronous filename analysis.
//!
//! Runs once when a file enters the batch and writes the filename-origin
//! fields of the context. Nothing here fails: a signal that cannot be found
//! leaves its field unset.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::context::{Context, Field};

/// Source class and every pattern that identifies it. The first pattern of the
/// first rule that matches wins; capture group 1 is the token as written.
struct SourceRule {
    class: &'static str,
    patterns: Vec<Regex>,
}

impl SourceRule {
    fn new(class: &'static str, patterns: &[&str]) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p).expect("source pattern must compile"))
            .collect();
        Self { class, patterns }
    }

    fn find<'a>(&self, name: &'a str) -> Option<&'a str> {
        self.patterns
            .iter()
            .find_map(|re| re.captures(name))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

const WEB_PROVIDERS: &str = "ABC|ATVP|AMC|AMZN|BBC|CBS|CC|CR|CRAV|CW|DCU|DSNP|DSNY|Disney[+]|DisneyPlus|FBWatch|FREE|FOX|HBO|MAX|HMAX|HULU|iP|iT|LIFE|MA|MTV|NBC|NICK|NF|Netflix|RED|TF1|STZ|STAN|PCOK|PMTP";

/// Media source classes in priority order.
static SOURCE_RULES: LazyLock<Vec<SourceRule>> = LazyLock::new(|| {
    let web = format!(
        r"\b((?:(?:{WEB_PROVIDERS})[ .-])?(?:WEB.?DL|WEB.?DLRip|WEB.?Cap|WEB.?Rip|HC|HD.?Rip|VODR|VODRip|PPV|PPVRip|iTunesHD|ithd|AmazonHD|NetflixHD|NetflixUHD))\b"
    );
    vec![
        SourceRule::new(
            "BluRay",
            &[r"\b(Blu.?Ray|BDRip|BRip|BR.?Rip|BDMV|BD|BDR|BD25|BD50|BD5|BD9|3D.?BluRay|3DBD|BDRemux|BDRX)\b"],
        ),
        SourceRule::new("CAM", &[r"\b(CAM|CAMRip|CAM.?Rip)\b"]),
        SourceRule::new("DVD-R", &[r"\b(DVD.?R|DVD.?Full|Full.?Rip|DVD|DVD.?[59])\b"]),
        SourceRule::new("DVDRip", &[r"\b(DVD.?Rip|DVD.?Mux)\b"]),
        SourceRule::new("HDDVD", &[r"\b(HDDVD)\b"]),
        SourceRule::new("HDTV", &[r"\b(HDTV|DVB|DVBRip|DTVRip|HDTVRip)\b"]),
        SourceRule::new("LaserRip", &[r"\b(LaserRip|Laserdisc)\b"]),
        SourceRule::new("MicroHD", &[r"\b(Micro.?HD)\b"]),
        SourceRule::new("R5", &[r"\b(R5|R5.?LINE)\b"]),
        SourceRule::new(
            "SCREENER",
            &[r"\b(SCREENER|SCR|DVDSCR|DVDSCREENER|BDSCR|BR.?Scr|BR.?Screener)\b"],
        ),
        SourceRule::new("SDTV", &[r"\b(SDTV|PDTV|DSR|DSRip|SATRip|DTHRip|TVRip)\b"]),
        SourceRule::new("TELECINE", &[r"\b(TELECINE|TC|HDTC)\b"]),
        SourceRule::new("TELESYNC", &[r"\b(TELESYNC|TS|HDTS|PDVD|PTVD|PreDVDRip)\b"]),
        SourceRule::new("UnknownRip", &[r"\b(UnknownRip|URip)\b"]),
        SourceRule::new("VCD", &[r"\b(VCD)\b"]),
        SourceRule::new("VHS", &[r"\b(VHS|VHSRip)\b"]),
        // A bare `WEB` only counts next to a resolution or a codec.
        SourceRule::new(
            "WEB-DL",
            &[web.as_str(), r"\d{3,4}p.(WEB)\b", r"\b(WEB).[hx]\d{3}\b"],
        ),
        SourceRule::new("WorkPrint", &[r"\b(WORKPRINT|WP)\b"]),
    ]
});

static SUFFIX_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[.\s][^.\s-]+-(?P<group>[A-Za-z0-9]+)$").expect("group regex must compile")
});

static PREFIX_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<group>[^\]]+)\]").expect("group regex must compile")
});

/// Classify the media source of a file name: `(class, token)`.
pub fn detect_source(name: &str) -> Option<(&'static str, &str)> {
    SOURCE_RULES
        .iter()
        .find_map(|rule| rule.find(name).map(|token| (rule.class, token)))
}

/// Release group from a `-GROUP` suffix or a `[GROUP]` prefix.
pub fn detect_group(stem: &str) -> Option<&str> {
    SUFFIX_GROUP_RE
        .captures(stem)
        .or_else(|| PREFIX_GROUP_RE.captures(stem))
        .and_then(|caps| caps.name("group"))
        .map(|m| m.as_str().trim())
        .filter(|group| !group.is_empty())
}

/// Write the filename-origin fields for `path` into `ctx`.
pub fn analyze_filename(path: &Path, ctx: &mut Context) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    ctx.set(Field::FileName, stem.as_str());
    if let Some(ext) = path.extension().map(|e| e.to_string_lossy().into_owned()) {
        ctx.set(Field::ContainerFormat, ext.to_lowercase());
        ctx.set(Field::Extension, ext);
    }

    if let Some((class, token)) = detect_source(&name) {
        ctx.set(Field::SourceClass, class);
        ctx.set(Field::SourceMatch, token);
    }
    ctx.set_opt(Field::Group, detect_group(&stem));

    tracing::trace!(file = %name, "filename analyzed");
}
