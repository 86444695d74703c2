use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::bail;

/// Years covered by the archived time schedules.
pub const FIRST_YEAR: i32 = 2003;
pub const LAST_YEAR: i32 = 2024;

pub const QUARTERS: [Quarter; 4] = [Quarter::Aut, Quarter::Win, Quarter::Spr, Quarter::Sum];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quarter {
    Aut,
    Win,
    Spr,
    Sum,
}

impl Quarter {
    pub fn code(self) -> &'static str {
        match self {
            Quarter::Aut => "AUT",
            Quarter::Win => "WIN",
            Quarter::Spr => "SPR",
            Quarter::Sum => "SUM",
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Quarter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUT" => Ok(Quarter::Aut),
            "WIN" => Ok(Quarter::Win),
            "SPR" => Ok(Quarter::Spr),
            "SUM" => Ok(Quarter::Sum),
            other => bail!("unknown quarter code: {:?}", other),
        }
    }
}

/// What makes two courses the same course. Description is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CourseKey {
    pub department: String,
    pub number: i32,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Course {
    pub department: String,
    pub number: i32,
    pub name: String,
    pub description: String,
}

impl Course {
    pub fn new(department: &str, number: i32, name: &str, description: &str) -> Self {
        Course {
            department: department.trim().to_lowercase(),
            number,
            name: name.trim().to_lowercase(),
            description: description.to_string(),
        }
    }

    pub fn key(&self) -> CourseKey {
        CourseKey {
            department: self.department.clone(),
            number: self.number,
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.department, self.number, self.name)
    }
}

/// Courses deduplicated by [`CourseKey`]. The first record for a key wins.
#[derive(Debug, Default)]
pub struct CourseSet {
    by_key: BTreeMap<CourseKey, Course>,
}

impl CourseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an equal course was already present.
    pub fn insert(&mut self, course: Course) -> bool {
        let key = course.key();
        if self.by_key.contains_key(&key) {
            return false;
        }
        self.by_key.insert(key, course);
        true
    }

    pub fn contains(&self, course: &Course) -> bool {
        self.by_key.contains_key(&course.key())
    }

    pub fn get(&self, key: &CourseKey) -> Option<&Course> {
        self.by_key.get(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Course> {
        self.by_key.values()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProfessorKey {
    pub first_name: String,
    pub last_name: String,
}

/// One instructor appearance in one term's schedule.
#[derive(Debug, Clone)]
pub struct Professor {
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<char>,
    pub quarter: Quarter,
    pub year: i32,
    pub course: Course,
}

impl Professor {
    pub fn key(&self) -> ProfessorKey {
        ProfessorKey {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

impl fmt::Display for Professor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.middle_name {
            Some(m) => write!(f, "{} {} {}", self.first_name, m, self.last_name),
            None => write!(f, "{} {}", self.first_name, self.last_name),
        }
    }
}
