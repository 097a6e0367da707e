use super::RuleInput;
use crate::model::{Access, FlaggedGlobal, GlobalCategory, RiskFinding, RuleKind, Severity};

const NETWORK: &[&str] = &[
    "fetch",
    "XMLHttpRequest",
    "ActiveXObject",
    "WebSocket",
    "EventSource",
    "navigator",
    "Image",
    "Script",
];

const DOM: &[&str] = &["document", "window", "addEventListener"];

/// Event-handler properties of the global object. Only assigning one is
/// interesting; reading `onload` is harmless.
const DOM_CALLBACKS: &[&str] = &[
    "onsearch",
    "onappinstalled",
    "onbeforeinstallprompt",
    "onbeforexrselect",
    "onabort",
    "onbeforeinput",
    "onbeforematch",
    "onbeforetoggle",
    "onblur",
    "oncancel",
    "oncanplay",
    "oncanplaythrough",
    "onchange",
    "onclick",
    "onclose",
    "oncommand",
    "oncontentvisibilityautostatechange",
    "oncontextlost",
    "oncontextmenu",
    "oncontextrestored",
    "oncuechange",
    "ondblclick",
    "ondrag",
    "ondragend",
    "ondragenter",
    "ondragleave",
    "ondragover",
    "ondragstart",
    "ondrop",
    "ondurationchange",
    "onemptied",
    "onended",
    "onerror",
    "onfocus",
    "onformdata",
    "oninput",
    "oninvalid",
    "onkeydown",
    "onkeypress",
    "onkeyup",
    "onload",
    "onloadeddata",
    "onloadedmetadata",
    "onloadstart",
    "onmousedown",
    "onmouseenter",
    "onmouseleave",
    "onmousemove",
    "onmouseout",
    "onmouseover",
    "onmouseup",
    "onmousewheel",
    "onpause",
    "onplay",
    "onplaying",
    "onprogress",
    "onratechange",
    "onreset",
    "onresize",
    "onscroll",
    "onscrollend",
    "onsecuritypolicyviolation",
    "onseeked",
    "onseeking",
    "onselect",
    "onslotchange",
    "onstalled",
    "onsubmit",
    "onsuspend",
    "ontimeupdate",
    "ontoggle",
    "onvolumechange",
    "onwaiting",
    "onwebkitanimationend",
    "onwebkitanimationiteration",
    "onwebkitanimationstart",
    "onwebkittransitionend",
    "onwheel",
    "onauxclick",
    "ongotpointercapture",
    "onlostpointercapture",
    "onpointerdown",
    "onpointermove",
    "onpointerrawupdate",
    "onpointerup",
    "onpointercancel",
    "onpointerover",
    "onpointerout",
    "onpointerenter",
    "onpointerleave",
    "onselectstart",
    "onselectionchange",
    "onanimationend",
    "onanimationiteration",
    "onanimationstart",
    "ontransitionrun",
    "ontransitionstart",
    "ontransitionend",
    "ontransitioncancel",
    "onafterprint",
    "onbeforeprint",
    "onbeforeunload",
    "onhashchange",
    "onlanguagechange",
    "onmessage",
    "onmessageerror",
    "onoffline",
    "ononline",
    "onpagehide",
    "onpageshow",
    "onpopstate",
    "onrejectionhandled",
    "onstorage",
    "onunhandledrejection",
    "onunload",
    "ondevicemotion",
    "ondeviceorientation",
    "ondeviceorientationabsolute",
    "onpageswap",
    "onpagereveal",
    "onscrollsnapchange",
    "onscrollsnapchanging",
];

const CODE_EXECUTION: &[&str] = &["eval"];

const LOCAL_STORAGE: &[&str] = &["localStorage", "sessionStorage", "IndexedDB", "cookies"];

const EXTENSION_API: &str = "chrome";

/// The capability a global grants, if it is one worth flagging.
pub fn classify_global(name: &str, access: Access) -> Option<GlobalCategory> {
    if NETWORK.contains(&name) {
        Some(GlobalCategory::Network)
    } else if DOM.contains(&name) || (access.is_write() && DOM_CALLBACKS.contains(&name)) {
        Some(GlobalCategory::Dom)
    } else if CODE_EXECUTION.contains(&name) {
        Some(GlobalCategory::CodeExecution)
    } else if LOCAL_STORAGE.contains(&name) {
        Some(GlobalCategory::LocalStorage)
    } else if name == EXTENSION_API {
        Some(GlobalCategory::ExtensionApi)
    } else {
        None
    }
}

pub(super) fn check(input: &RuleInput<'_>) -> Option<RiskFinding> {
    let flagged: Vec<FlaggedGlobal> = input
        .globals
        .iter()
        .filter_map(|(name, &access)| {
            classify_global(name, access).map(|category| FlaggedGlobal {
                name: name.clone(),
                access,
                category,
            })
        })
        .collect();

    if flagged.is_empty() {
        return None;
    }

    let evidence = flagged
        .iter()
        .map(|g| {
            let verb = match g.access {
                Access::Read => "access",
                Access::ReadWrite => "read-write",
            };
            format!(
                "- {} {} ({}): {}",
                verb,
                g.name,
                g.category.as_str(),
                g.category.description()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    Some(
        RiskFinding::new(
            RuleKind::DangerousGlobals,
            Severity::High,
            "uses dangerous global variables",
            evidence,
        )
        .with_flagged(flagged),
    )
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(classify_global("fetch", Access::Read), Some(GlobalCategory::Network));
        assert_eq!(classify_global("document", Access::Read), Some(GlobalCategory::Dom));
        assert_eq!(classify_global("eval", Access::Read), Some(GlobalCategory::CodeExecution));
        assert_eq!(classify_global("cookies", Access::Read), Some(GlobalCategory::LocalStorage));
        assert_eq!(classify_global("chrome", Access::Read), Some(GlobalCategory::ExtensionApi));
        assert_eq!(classify_global("process", Access::ReadWrite), None);
    }

    #[test]
    fn test_event_callbacks_only_flag_writes() {
        assert_eq!(classify_global("onclick", Access::Read), None);
        assert_eq!(classify_global("onclick", Access::ReadWrite), Some(GlobalCategory::Dom));
    }

    #[test]
    fn test_fires_with_evidence_and_flagged() {
        let mut inputs = Inputs::new();
        inputs.globals.record("fetch", Access::Read);
        inputs.globals.record("onload", Access::ReadWrite);
        inputs.globals.record("require", Access::Read);

        let finding = check(&inputs.input("1.0.0")).unwrap();

        assert_eq!(finding.severity, Severity::High);
        assert_eq!(
            finding.evidence,
            "- access fetch (network request): can send network requests, possibly exfiltrating data\n\
             - read-write onload (DOM access): can read sensitive page content such as wallet mnemonics"
        );
        let names: Vec<&str> = finding.flagged.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["fetch", "onload"]);
    }

    #[test]
    fn test_harmless_globals_do_not_fire() {
        let mut inputs = Inputs::new();
        inputs.globals.record("require", Access::Read);
        inputs.globals.record("onload", Access::Read);
        assert!(check(&inputs.input("1.0.0")).is_none());
    }
}
