use std::collections::HashMap;
use std::sync::LazyLock;

/// Truncated titles as printed in old time schedules, mapped to current catalog titles.
const COURSE_NAMES: &[(&str, &str)] = &[
    ("gender & info tech", "gender and information technology"),
    ("soc med ethics auto", "social media, ethics, and automation"),
    ("intro data science", "introduction to data science"),
    ("exploring inform", "exploring informatics"),
    ("intell foundations", "intellectual foundations of informatics"),
    ("data sci foundations", "foundational skills for data science"),
    ("data rsng digit wrld", "data raising in a digital world"),
    ("orientation to info", "orientation to informatics"),
    ("info assr & cybrsec", "information assurance and cybersecurity"),
    ("entrprise risk mgmt", "enterprise risk management"),
    ("comp net & dist app", "computer networks and distributed applications"),
    ("db & data modeling", "database and data modeling"),
    ("info architecture", "introduction to information architecture"),
    ("client-side dev", "client-side development"),
    ("info ethics & policy", "information ethics and policy"),
    ("race gender & info", "race, gender, and information"),
    ("indig digital wrld", "indigenous ways of knowing in the digital world"),
    ("info policy design", "information policy design"),
    ("moral reason & dsgn", "moral reasoning and interaction design"),
    ("record of us all", "the record of us all"),
    ("visual info design", "visual information design"),
    ("mobile app design", "mobile application design"),
    ("data science methds", "core methods in data science"),
    ("adv data sci methds", "advanced methods in data science"),
    ("is analysis & dsgn", "product and information systems management"),
    ("professionalism", "professionalism in informatics"),
    ("topics in cybersec", "emerging topics in information assurance and cybersecurity"),
    ("db design & mgmt", "database design and management"),
    ("content strategy", "content strategy in information architecture"),
    ("server-side dev", "server-side development"),
    ("coop software dev", "cooperative software development"),
    ("software arch", "software architecture for interactive systems"),
    ("android mobile dev", "mobile development: android"),
    ("ios mobile dev", "mobile development: ios"),
    ("input & interaction", "input and interaction"),
    ("val sen design", "value sensitive design"),
    ("tech time & design", "technology, time and design"),
    ("des pers hlth & well", "designing for personal health and wellness"),
    ("interactive info vis", "interactive information visualization"),
    ("pop health info", "population health informatics"),
    ("project management", "project management in informatics"),
    ("capstone project ii", "project capstone ii"),
    ("internship", "internship in informatics"),
    ("service lrn in info", "service learning in informatics"),
    ("topic informatics", "special topics in informatics"),
    ("ind study", "independent study"),
];

static COURSE_NAME_MAP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| COURSE_NAMES.iter().copied().collect());

/// Canonical title for a lowercased schedule title; unknown titles pass through.
pub fn canonical_course_name(name: &str) -> &str {
    COURSE_NAME_MAP.get(name).copied().unwrap_or(name)
}
