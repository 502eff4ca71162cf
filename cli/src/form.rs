use crate::types::{SubmissionPayload, TrackLength};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Mood,
    Age,
    Pricing,
    Length,
    Artist,
    Vision,
}

pub const FIELD_ORDER: [FormField; 6] = [
    FormField::Mood,
    FormField::Age,
    FormField::Pricing,
    FormField::Length,
    FormField::Artist,
    FormField::Vision,
];

impl FormField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mood => "Mood",
            Self::Age => "Age",
            Self::Pricing => "Pricing",
            Self::Length => "Length (seconds)",
            Self::Artist => "Artist",
            Self::Vision => "Vision",
        }
    }
}

/// Current contents of the six form fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormValues {
    pub mood: String,
    pub age: String,
    pub pricing: String,
    pub length: String,
    pub artist: String,
    pub vision: String,
}

impl FormValues {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Mood => &self.mood,
            FormField::Age => &self.age,
            FormField::Pricing => &self.pricing,
            FormField::Length => &self.length,
            FormField::Artist => &self.artist,
            FormField::Vision => &self.vision,
        }
    }

    pub fn get_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Mood => &mut self.mood,
            FormField::Age => &mut self.age,
            FormField::Pricing => &mut self.pricing,
            FormField::Length => &mut self.length,
            FormField::Artist => &mut self.artist,
            FormField::Vision => &mut self.vision,
        }
    }

    pub fn to_payload(&self) -> SubmissionPayload {
        SubmissionPayload {
            mood: self.mood.clone(),
            age: self.age.clone(),
            pricing: self.pricing.clone(),
            length: TrackLength::parse(&self.length),
            artist: self.artist.clone(),
            vision: self.vision.clone(),
        }
    }
}

/// Editable form with a focused field. `reset` restores the values the form
/// was created with.
#[derive(Debug, Clone)]
pub struct Form {
    initial: FormValues,
    values: FormValues,
    focused: FormField,
}

impl Form {
    pub fn new(initial: FormValues) -> Self {
        Self { values: initial.clone(), initial, focused: FormField::Mood }
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn focused(&self) -> FormField {
        self.focused
    }

    pub fn focus_next(&mut self) {
        let idx = FIELD_ORDER.iter().position(|field| *field == self.focused).unwrap_or(0);
        self.focused = FIELD_ORDER[(idx + 1) % FIELD_ORDER.len()];
    }

    pub fn focus_prev(&mut self) {
        let idx = FIELD_ORDER.iter().position(|field| *field == self.focused).unwrap_or(0);
        let prev = if idx == 0 { FIELD_ORDER.len() - 1 } else { idx - 1 };
        self.focused = FIELD_ORDER[prev];
    }

    pub fn insert_char(&mut self, c: char) {
        self.values.get_mut(self.focused).push(c);
    }

    pub fn backspace(&mut self) {
        self.values.get_mut(self.focused).pop();
    }

    pub fn reset(&mut self) {
        self.values = self.initial.clone();
        self.focused = FormField::Mood;
    }
}

impl Default for Form {
    fn default() -> Self {
        Self::new(FormValues::default())
    }
}
