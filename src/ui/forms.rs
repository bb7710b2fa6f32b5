use anyhow::{anyhow, Context, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{
    Course, CourseInput, CoursePatch, EnrollmentDetail, EnrollmentInput, Student, StudentInput,
    StudentPatch,
};

/// Lowest and highest credit count the course form accepts.
pub(crate) const CREDIT_RANGE: std::ops::RangeInclusive<i64> = 1..=10;

/// Render one `Label: value` line, highlighting the focused field and
/// showing a placeholder for empty ones.
fn field_line(label: &str, value: &str, active: bool, required: bool) -> Line<'static> {
    let display = if value.is_empty() {
        let placeholder = if required { "<required>" } else { "<optional>" };
        placeholder.to_string()
    } else {
        value.to_string()
    };

    let style = if active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(format!("{label}: ")),
        Span::styled(display, style),
    ])
}

/// Form state for adding or editing a student.
#[derive(Default, Clone)]
pub(crate) struct StudentForm {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) phone: String,
    pub(crate) address: String,
    pub(crate) active: StudentField,
    pub(crate) error: Option<String>,
}

#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub(crate) enum StudentField {
    #[default]
    Name,
    Email,
    Phone,
    Address,
}

impl StudentField {
    pub(crate) const ALL: [StudentField; 4] = [
        StudentField::Name,
        StudentField::Email,
        StudentField::Phone,
        StudentField::Address,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            StudentField::Name => "Name",
            StudentField::Email => "Email",
            StudentField::Phone => "Phone",
            StudentField::Address => "Address",
        }
    }

    fn required(self) -> bool {
        matches!(self, StudentField::Name | StudentField::Email)
    }
}

impl StudentForm {
    pub(crate) fn from_student(student: &Student) -> Self {
        Self {
            name: student.name.clone(),
            email: student.email.clone(),
            phone: student.phone.clone().unwrap_or_default(),
            address: student.address.clone().unwrap_or_default(),
            active: StudentField::Name,
            error: None,
        }
    }

    fn value(&self, field: StudentField) -> &String {
        match field {
            StudentField::Name => &self.name,
            StudentField::Email => &self.email,
            StudentField::Phone => &self.phone,
            StudentField::Address => &self.address,
        }
    }

    fn value_mut(&mut self, field: StudentField) -> &mut String {
        match field {
            StudentField::Name => &mut self.name,
            StudentField::Email => &mut self.email,
            StudentField::Phone => &mut self.phone,
            StudentField::Address => &mut self.address,
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.active = match self.active {
            StudentField::Name => StudentField::Email,
            StudentField::Email => StudentField::Phone,
            StudentField::Phone => StudentField::Address,
            StudentField::Address => StudentField::Name,
        };
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = match self.active {
            StudentField::Name => StudentField::Address,
            StudentField::Email => StudentField::Name,
            StudentField::Phone => StudentField::Email,
            StudentField::Address => StudentField::Phone,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.value_mut(self.active).push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.value_mut(self.active).pop();
    }

    fn check_required(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() {
            return Err(anyhow!("Name and email are required."));
        }
        Ok(())
    }

    pub(crate) fn to_input(&self) -> Result<StudentInput> {
        self.check_required()?;
        Ok(StudentInput {
            name: Some(self.name.clone()),
            email: Some(self.email.clone()),
            phone: Some(self.phone.clone()),
            address: Some(self.address.clone()),
        })
    }

    /// Every field is sent; a cleared optional field clears the column.
    pub(crate) fn to_patch(&self) -> Result<StudentPatch> {
        self.check_required()?;
        Ok(StudentPatch {
            name: Some(self.name.clone()),
            email: Some(self.email.clone()),
            phone: Some(Some(self.phone.clone())),
            address: Some(Some(self.address.clone())),
        })
    }

    pub(crate) fn lines(&self) -> Vec<Line<'static>> {
        StudentField::ALL
            .iter()
            .map(|&field| {
                field_line(
                    field.label(),
                    self.value(field),
                    self.active == field,
                    field.required(),
                )
            })
            .collect()
    }

    /// Cursor column and row offsets within the form body.
    pub(crate) fn cursor(&self) -> (u16, u16) {
        let row = StudentField::ALL
            .iter()
            .position(|&field| field == self.active)
            .unwrap_or(0);
        let prefix = self.active.label().len() + 2;
        let column = prefix + self.value(self.active).chars().count();
        (column as u16, row as u16)
    }
}

/// Form state for adding or editing a course.
#[derive(Default, Clone)]
pub(crate) struct CourseForm {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) credits: String,
    pub(crate) instructor: String,
    pub(crate) active: CourseField,
    pub(crate) error: Option<String>,
}

#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub(crate) enum CourseField {
    #[default]
    Name,
    Description,
    Credits,
    Instructor,
}

impl CourseField {
    pub(crate) const ALL: [CourseField; 4] = [
        CourseField::Name,
        CourseField::Description,
        CourseField::Credits,
        CourseField::Instructor,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            CourseField::Name => "Name",
            CourseField::Description => "Description",
            CourseField::Credits => "Credits",
            CourseField::Instructor => "Instructor",
        }
    }
}

impl CourseForm {
    pub(crate) fn from_course(course: &Course) -> Self {
        Self {
            name: course.name.clone(),
            description: course.description.clone().unwrap_or_default(),
            credits: course.credits.map(|c| c.to_string()).unwrap_or_default(),
            instructor: course.instructor.clone().unwrap_or_default(),
            active: CourseField::Name,
            error: None,
        }
    }

    fn value(&self, field: CourseField) -> &String {
        match field {
            CourseField::Name => &self.name,
            CourseField::Description => &self.description,
            CourseField::Credits => &self.credits,
            CourseField::Instructor => &self.instructor,
        }
    }

    fn value_mut(&mut self, field: CourseField) -> &mut String {
        match field {
            CourseField::Name => &mut self.name,
            CourseField::Description => &mut self.description,
            CourseField::Credits => &mut self.credits,
            CourseField::Instructor => &mut self.instructor,
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.active = match self.active {
            CourseField::Name => CourseField::Description,
            CourseField::Description => CourseField::Credits,
            CourseField::Credits => CourseField::Instructor,
            CourseField::Instructor => CourseField::Name,
        };
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = match self.active {
            CourseField::Name => CourseField::Instructor,
            CourseField::Description => CourseField::Name,
            CourseField::Credits => CourseField::Description,
            CourseField::Instructor => CourseField::Credits,
        };
    }

    /// Credits only take digits; everything else takes any printable char.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let accepted = match self.active {
            CourseField::Credits => ch.is_ascii_digit(),
            _ => !ch.is_control(),
        };
        if accepted {
            self.value_mut(self.active).push(ch);
        }
        accepted
    }

    pub(crate) fn backspace(&mut self) {
        self.value_mut(self.active).pop();
    }

    fn parse_credits(&self) -> Result<Option<i64>> {
        let raw = self.credits.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let credits = raw
            .parse::<i64>()
            .context("Credits must be a whole number.")?;
        if !CREDIT_RANGE.contains(&credits) {
            return Err(anyhow!(
                "Credits must be between {} and {}.",
                CREDIT_RANGE.start(),
                CREDIT_RANGE.end()
            ));
        }
        Ok(Some(credits))
    }

    pub(crate) fn to_input(&self) -> Result<CourseInput> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("Course name is required."));
        }
        Ok(CourseInput {
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            credits: self.parse_credits()?,
            instructor: Some(self.instructor.clone()),
        })
    }

    /// Like the student form, every field is sent; blank credits clear the
    /// stored value.
    pub(crate) fn to_patch(&self) -> Result<CoursePatch> {
        let input = self.to_input()?;
        Ok(CoursePatch {
            name: input.name,
            description: Some(input.description),
            credits: Some(input.credits),
            instructor: Some(input.instructor),
        })
    }

    pub(crate) fn lines(&self) -> Vec<Line<'static>> {
        CourseField::ALL
            .iter()
            .map(|&field| {
                field_line(
                    field.label(),
                    self.value(field),
                    self.active == field,
                    field == CourseField::Name,
                )
            })
            .collect()
    }

    pub(crate) fn cursor(&self) -> (u16, u16) {
        let row = CourseField::ALL
            .iter()
            .position(|&field| field == self.active)
            .unwrap_or(0);
        let prefix = self.active.label().len() + 2;
        let column = prefix + self.value(self.active).chars().count();
        (column as u16, row as u16)
    }
}

/// Picker state for a new enrollment: one index into each list.
#[derive(Default, Clone)]
pub(crate) struct EnrollmentForm {
    pub(crate) student: usize,
    pub(crate) course: usize,
    pub(crate) active: EnrollmentField,
    pub(crate) error: Option<String>,
}

#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub(crate) enum EnrollmentField {
    #[default]
    Student,
    Course,
}

impl EnrollmentForm {
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            EnrollmentField::Student => EnrollmentField::Course,
            EnrollmentField::Course => EnrollmentField::Student,
        };
    }

    /// Move the active picker, wrapping around `len` entries.
    pub(crate) fn step(&mut self, offset: isize, student_count: usize, course_count: usize) {
        let (index, len) = match self.active {
            EnrollmentField::Student => (&mut self.student, student_count),
            EnrollmentField::Course => (&mut self.course, course_count),
        };
        if len == 0 {
            *index = 0;
            return;
        }
        let next = (*index as isize + offset).rem_euclid(len as isize);
        *index = next as usize;
    }

    pub(crate) fn to_input(&self, students: &[Student], courses: &[Course]) -> Result<EnrollmentInput> {
        let student = students
            .get(self.student)
            .ok_or_else(|| anyhow!("Add a student first."))?;
        let course = courses
            .get(self.course)
            .ok_or_else(|| anyhow!("Add a course first."))?;
        Ok(EnrollmentInput {
            student_id: Some(student.id),
            course_id: Some(course.id),
        })
    }

    pub(crate) fn lines(&self, students: &[Student], courses: &[Course]) -> Vec<Line<'static>> {
        let student = students
            .get(self.student)
            .map(|s| format!("◀ {s} ▶"))
            .unwrap_or_default();
        let course = courses
            .get(self.course)
            .map(|c| format!("◀ {c} ▶"))
            .unwrap_or_default();
        vec![
            field_line(
                "Student",
                &student,
                self.active == EnrollmentField::Student,
                true,
            ),
            field_line(
                "Course",
                &course,
                self.active == EnrollmentField::Course,
                true,
            ),
        ]
    }
}

/// What a pending delete confirmation points at.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum DeleteTarget {
    Student,
    Course,
    Enrollment,
}

#[derive(Clone)]
pub(crate) struct ConfirmDelete {
    pub(crate) target: DeleteTarget,
    pub(crate) id: i64,
    pub(crate) label: String,
}

impl ConfirmDelete {
    pub(crate) fn student(student: &Student) -> Self {
        Self {
            target: DeleteTarget::Student,
            id: student.id,
            label: student.name.clone(),
        }
    }

    pub(crate) fn course(course: &Course) -> Self {
        Self {
            target: DeleteTarget::Course,
            id: course.id,
            label: course.name.clone(),
        }
    }

    pub(crate) fn enrollment(detail: &EnrollmentDetail) -> Self {
        Self {
            target: DeleteTarget::Enrollment,
            id: detail.enrollment.id,
            label: format!("{} in {}", detail.student.name, detail.course.name),
        }
    }

    /// Extra warning shown under the question.
    pub(crate) fn consequence(&self) -> &'static str {
        match self.target {
            DeleteTarget::Student => "Their enrollments will be removed too.",
            DeleteTarget::Course => "Every enrollment in this course will be removed too.",
            DeleteTarget::Enrollment => "The student and course are kept.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::Patch;

    fn course(id: i64, name: &str) -> Course {
        Course {
            id,
            name: name.into(),
            description: None,
            credits: Some(3),
            instructor: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn student_form_requires_name_and_email() {
        let mut form = StudentForm::default();
        for ch in "Ada".chars() {
            form.push_char(ch);
        }
        assert!(form.to_input().is_err());

        form.next_field();
        for ch in "ada@example.com".chars() {
            form.push_char(ch);
        }
        let input = form.to_input().unwrap();
        assert_eq!(input.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn course_credits_accept_digits_only() {
        let mut form = CourseForm {
            active: CourseField::Credits,
            ..Default::default()
        };
        assert!(!form.push_char('x'));
        assert!(form.push_char('4'));
        assert_eq!(form.credits, "4");
    }

    #[test]
    fn course_credits_are_bounded() {
        let form = CourseForm {
            name: "Algebra".into(),
            credits: "11".into(),
            ..Default::default()
        };
        assert_eq!(
            form.to_input().unwrap_err().to_string(),
            "Credits must be between 1 and 10."
        );

        let form = CourseForm {
            credits: "10".into(),
            ..form
        };
        assert_eq!(form.to_input().unwrap().credits, Some(10));
    }

    #[test]
    fn blank_credits_are_omitted() {
        let form = CourseForm {
            name: "Algebra".into(),
            ..Default::default()
        };
        assert_eq!(form.to_input().unwrap().credits, None);
    }

    #[test]
    fn blank_credits_clear_on_edit() {
        let form = CourseForm::from_course(&Course {
            credits: None,
            ..course(1, "Algebra")
        });
        let patch = form.to_patch().unwrap();
        assert_eq!(patch.credits, Some(None));

        let mut stored = course(1, "Algebra");
        stored.credits = Some(4);
        assert_eq!(patch.apply_to(stored).credits, None);
    }

    #[test]
    fn enrollment_picker_wraps() {
        let mut form = EnrollmentForm {
            active: EnrollmentField::Course,
            ..Default::default()
        };
        form.step(-1, 0, 3);
        assert_eq!(form.course, 2);
        form.step(1, 0, 3);
        assert_eq!(form.course, 0);
    }

    #[test]
    fn enrollment_form_needs_both_lists() {
        let form = EnrollmentForm::default();
        let err = form.to_input(&[], &[course(1, "Algebra")]).unwrap_err();
        assert_eq!(err.to_string(), "Add a student first.");
    }

    #[test]
    fn cursor_tracks_active_field() {
        let mut form = StudentForm::default();
        form.next_field();
        form.push_char('a');
        assert_eq!(form.cursor(), ("Email: ".len() as u16 + 1, 1));
    }
}
