use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use open::that as open_link;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Frame;
use tracing::{info, warn};

use crate::models::{Course, EnrollmentDetail, Student};

use super::client::ApiClient;
use super::forms::{
    ConfirmDelete, CourseForm, DeleteTarget, EnrollmentForm, StudentForm,
};
use super::helpers::{centered_rect, or_dash, stat_lines, surface_error};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Height of the tab bar at the top of every screen.
const TABS_HEIGHT: u16 = 3;
/// Height of each dashboard tile.
const STAT_HEIGHT: u16 = 6;

/// Top-level screens, in tab order.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Screen {
    Dashboard,
    Students,
    Courses,
    Enrollments,
}

impl Screen {
    const ALL: [Screen; 4] = [
        Screen::Dashboard,
        Screen::Students,
        Screen::Courses,
        Screen::Enrollments,
    ];

    fn title(self) -> &'static str {
        match self {
            Screen::Dashboard => "Dashboard",
            Screen::Students => "Students",
            Screen::Courses => "Courses",
            Screen::Enrollments => "Enrollments",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    fn offset(self, by: isize) -> Screen {
        let len = Self::ALL.len() as isize;
        let next = (self.index() as isize + by).rem_euclid(len);
        Self::ALL[next as usize]
    }
}

/// What the keyboard is currently driving.
enum Mode {
    Normal,
    AddingStudent(StudentForm),
    EditingStudent { id: i64, form: StudentForm },
    AddingCourse(CourseForm),
    EditingCourse { id: i64, form: CourseForm },
    AddingEnrollment(EnrollmentForm),
    ConfirmDelete(ConfirmDelete),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state for the TUI. Lists are snapshots of the API and
/// get re-fetched after every mutation.
pub struct App {
    client: ApiClient,
    students: Vec<Student>,
    courses: Vec<Course>,
    enrollments: Vec<EnrollmentDetail>,
    loaded: bool,
    screen: Screen,
    student_selected: usize,
    course_selected: usize,
    enrollment_selected: usize,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            students: Vec::new(),
            courses: Vec::new(),
            enrollments: Vec::new(),
            loaded: false,
            screen: Screen::Dashboard,
            student_selected: 0,
            course_selected: 0,
            enrollment_selected: 0,
            mode: Mode::Normal,
            status: None,
        }
    }

    /// Build the app and fetch every list. A failed fetch is reported in the
    /// footer instead of aborting, so the user can retry with `r`.
    pub fn load(client: ApiClient) -> Self {
        let mut app = Self::new(client);
        if let Err(err) = app.refresh_all() {
            warn!(error = %format!("{err:#}"), "initial load failed");
            app.set_status(surface_error(&err), StatusKind::Error);
        }
        app
    }

    /// Apply one key press. Failures are reported in the footer, so the
    /// only outcome the caller sees is whether to exit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::AddingStudent(form) => self.handle_student_form(code, None, form),
            Mode::EditingStudent { id, form } => self.handle_student_form(code, Some(id), form),
            Mode::AddingCourse(form) => self.handle_course_form(code, None, form),
            Mode::EditingCourse { id, form } => self.handle_course_form(code, Some(id), form),
            Mode::AddingEnrollment(form) => self.handle_enrollment_form(code, form),
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm),
        };

        exit
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => *exit = true,
            KeyCode::Tab | KeyCode::Right => self.switch_screen(self.screen.offset(1)),
            KeyCode::BackTab | KeyCode::Left => self.switch_screen(self.screen.offset(-1)),
            KeyCode::Char(ch @ '1'..='4') => {
                let index = ch as usize - '1' as usize;
                self.switch_screen(Screen::ALL[index]);
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Char('r') | KeyCode::Char('R') => match self.refresh_all() {
                Ok(()) => self.set_status("Refreshed.", StatusKind::Info),
                Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
            },
            KeyCode::Char('+') | KeyCode::Char('a') => return self.open_add_form(),
            KeyCode::Char('e') | KeyCode::Char('E') => return self.open_edit_form(),
            KeyCode::Char('-') | KeyCode::Char('d') | KeyCode::Delete => {
                return self.open_delete_confirm()
            }
            KeyCode::Char('m') if self.screen == Screen::Students => self.mail_selected_student(),
            _ => {}
        }
        Mode::Normal
    }

    fn switch_screen(&mut self, screen: Screen) {
        self.clear_status();
        self.screen = screen;
    }

    fn open_add_form(&mut self) -> Mode {
        self.clear_status();
        match self.screen {
            Screen::Dashboard => Mode::Normal,
            Screen::Students => Mode::AddingStudent(StudentForm::default()),
            Screen::Courses => Mode::AddingCourse(CourseForm::default()),
            Screen::Enrollments => {
                if self.students.is_empty() || self.courses.is_empty() {
                    self.set_status(
                        "Add at least one student and one course first.",
                        StatusKind::Error,
                    );
                    Mode::Normal
                } else {
                    Mode::AddingEnrollment(EnrollmentForm::default())
                }
            }
        }
    }

    fn open_edit_form(&mut self) -> Mode {
        match self.screen {
            Screen::Students => match self.current_student() {
                Some(student) => Mode::EditingStudent {
                    id: student.id,
                    form: StudentForm::from_student(student),
                },
                None => {
                    self.set_status("No student selected to edit.", StatusKind::Error);
                    Mode::Normal
                }
            },
            Screen::Courses => match self.current_course() {
                Some(course) => Mode::EditingCourse {
                    id: course.id,
                    form: CourseForm::from_course(course),
                },
                None => {
                    self.set_status("No course selected to edit.", StatusKind::Error);
                    Mode::Normal
                }
            },
            Screen::Enrollments => {
                self.set_status(
                    "Enrollments cannot be edited; delete and re-add instead.",
                    StatusKind::Error,
                );
                Mode::Normal
            }
            Screen::Dashboard => Mode::Normal,
        }
    }

    fn open_delete_confirm(&mut self) -> Mode {
        let confirm = match self.screen {
            Screen::Students => self.current_student().map(ConfirmDelete::student),
            Screen::Courses => self.current_course().map(ConfirmDelete::course),
            Screen::Enrollments => self.current_enrollment().map(ConfirmDelete::enrollment),
            Screen::Dashboard => return Mode::Normal,
        };

        match confirm {
            Some(confirm) => {
                self.clear_status();
                Mode::ConfirmDelete(confirm)
            }
            None => {
                self.set_status("Nothing selected to delete.", StatusKind::Error);
                Mode::Normal
            }
        }
    }

    fn mail_selected_student(&mut self) {
        let Some(student) = self.current_student() else {
            self.set_status("No student selected.", StatusKind::Error);
            return;
        };
        let target = format!("mailto:{}", student.email);
        match open_link(&target) {
            Ok(()) => self.set_status(format!("Opened {target}."), StatusKind::Info),
            Err(err) => self.set_status(
                format!("Could not open mail client: {err}"),
                StatusKind::Error,
            ),
        }
    }

    fn handle_student_form(
        &mut self,
        code: KeyCode,
        id: Option<i64>,
        mut form: StudentForm,
    ) -> Mode {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_student(id, &form) {
                Ok(()) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        match (keep_open, id) {
            (false, _) => Mode::Normal,
            (true, Some(id)) => Mode::EditingStudent { id, form },
            (true, None) => Mode::AddingStudent(form),
        }
    }

    fn handle_course_form(
        &mut self,
        code: KeyCode,
        id: Option<i64>,
        mut form: CourseForm,
    ) -> Mode {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_course(id, &form) {
                Ok(()) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        match (keep_open, id) {
            (false, _) => Mode::Normal,
            (true, Some(id)) => Mode::EditingCourse { id, form },
            (true, None) => Mode::AddingCourse(form),
        }
    }

    fn handle_enrollment_form(&mut self, code: KeyCode, mut form: EnrollmentForm) -> Mode {
        let (students, courses) = (self.students.len(), self.courses.len());
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Left | KeyCode::Up => {
                form.step(-1, students, courses);
                form.error = None;
            }
            KeyCode::Right | KeyCode::Down => {
                form.step(1, students, courses);
                form.error = None;
            }
            KeyCode::Enter => match self.save_enrollment(&form) {
                Ok(()) => return Mode::Normal,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            _ => {}
        }
        Mode::AddingEnrollment(form)
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmDelete) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Err(err) = self.perform_delete(&confirm) {
                    self.set_status(surface_error(&err), StatusKind::Error);
                }
                Mode::Normal
            }
            _ => Mode::ConfirmDelete(confirm),
        }
    }

    fn save_student(&mut self, id: Option<i64>, form: &StudentForm) -> Result<()> {
        let student = match id {
            None => self.client.create_student(&form.to_input()?)?,
            Some(id) => self.client.update_student(id, &form.to_patch()?)?,
        };
        self.reload_students(Some(student.id))?;
        if id.is_some() {
            // Enrollment rows show the student's name.
            self.reload_enrollments(None)?;
        }
        let verb = if id.is_some() { "Updated" } else { "Added" };
        info!(id = student.id, "{} student", verb.to_lowercase());
        self.set_status(format!("{verb} {}.", student.name), StatusKind::Info);
        Ok(())
    }

    fn save_course(&mut self, id: Option<i64>, form: &CourseForm) -> Result<()> {
        let course = match id {
            None => self.client.create_course(&form.to_input()?)?,
            Some(id) => self.client.update_course(id, &form.to_patch()?)?,
        };
        self.reload_courses(Some(course.id))?;
        if id.is_some() {
            self.reload_enrollments(None)?;
        }
        let verb = if id.is_some() { "Updated" } else { "Added" };
        info!(id = course.id, "{} course", verb.to_lowercase());
        self.set_status(format!("{verb} {}.", course.name), StatusKind::Info);
        Ok(())
    }

    fn save_enrollment(&mut self, form: &EnrollmentForm) -> Result<()> {
        let input = form.to_input(&self.students, &self.courses)?;
        let enrollment = self.client.create_enrollment(&input)?;
        self.reload_enrollments(Some(enrollment.id))?;
        info!(id = enrollment.id, "added enrollment");
        self.set_status("Enrollment added.", StatusKind::Info);
        Ok(())
    }

    fn perform_delete(&mut self, confirm: &ConfirmDelete) -> Result<()> {
        let reply = match confirm.target {
            DeleteTarget::Student => {
                let reply = self.client.delete_student(confirm.id)?;
                self.reload_students(None)?;
                reply
            }
            DeleteTarget::Course => {
                let reply = self.client.delete_course(confirm.id)?;
                self.reload_courses(None)?;
                reply
            }
            DeleteTarget::Enrollment => self.client.delete_enrollment(confirm.id)?,
        };
        // Student and course deletes cascade, so enrollments always change.
        self.reload_enrollments(None)?;
        info!(id = confirm.id, target = ?confirm.target, "deleted record");
        self.set_status(reply.message, StatusKind::Info);
        Ok(())
    }

    fn refresh_all(&mut self) -> Result<()> {
        self.reload_students(None)?;
        self.reload_courses(None)?;
        self.reload_enrollments(None)?;
        self.loaded = true;
        Ok(())
    }

    fn reload_students(&mut self, focus_id: Option<i64>) -> Result<()> {
        self.students = self.client.list_students()?;
        self.student_selected = reselect(
            self.students.iter().map(|s| s.id),
            focus_id,
            self.student_selected,
        );
        Ok(())
    }

    fn reload_courses(&mut self, focus_id: Option<i64>) -> Result<()> {
        self.courses = self.client.list_courses()?;
        self.course_selected = reselect(
            self.courses.iter().map(|c| c.id),
            focus_id,
            self.course_selected,
        );
        Ok(())
    }

    fn reload_enrollments(&mut self, focus_id: Option<i64>) -> Result<()> {
        self.enrollments = self.client.list_enrollments()?;
        self.enrollment_selected = reselect(
            self.enrollments.iter().map(|e| e.enrollment.id),
            focus_id,
            self.enrollment_selected,
        );
        Ok(())
    }

    fn move_selection(&mut self, offset: isize) {
        let (selected, len) = match self.screen {
            Screen::Students => (&mut self.student_selected, self.students.len()),
            Screen::Courses => (&mut self.course_selected, self.courses.len()),
            Screen::Enrollments => (&mut self.enrollment_selected, self.enrollments.len()),
            Screen::Dashboard => return,
        };
        if len == 0 {
            return;
        }
        let next = (*selected as isize + offset).clamp(0, len as isize - 1);
        *selected = next as usize;
    }

    fn current_student(&self) -> Option<&Student> {
        self.students.get(self.student_selected)
    }

    fn current_course(&self) -> Option<&Course> {
        self.courses.get(self.course_selected)
    }

    fn current_enrollment(&self) -> Option<&EnrollmentDetail> {
        self.enrollments.get(self.enrollment_selected)
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(TABS_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_tabs(frame, chunks[0]);
        match self.screen {
            Screen::Dashboard => self.draw_dashboard(frame, chunks[1]),
            Screen::Students => self.draw_students(frame, chunks[1]),
            Screen::Courses => self.draw_courses(frame, chunks[1]),
            Screen::Enrollments => self.draw_enrollments(frame, chunks[1]),
        }
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::AddingStudent(form) => self.draw_student_form(frame, area, "Add Student", form),
            Mode::EditingStudent { form, .. } => {
                self.draw_student_form(frame, area, "Edit Student", form)
            }
            Mode::AddingCourse(form) => self.draw_course_form(frame, area, "Add Course", form),
            Mode::EditingCourse { form, .. } => {
                self.draw_course_form(frame, area, "Edit Course", form)
            }
            Mode::AddingEnrollment(form) => self.draw_enrollment_form(frame, area, form),
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::Normal => {}
        }
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles = Screen::ALL
            .iter()
            .enumerate()
            .map(|(idx, screen)| format!("{} {}", idx + 1, screen.title()));
        let tabs = Tabs::new(titles)
            .select(self.screen.index())
            .block(Block::default().borders(Borders::ALL).title("School Records"))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn draw_dashboard(&self, frame: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(STAT_HEIGHT), Constraint::Min(0)])
            .split(area);
        let tiles = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ])
            .split(rows[0]);

        let counts = [
            ("Total Students", self.students.len(), "Registered students"),
            ("Total Courses", self.courses.len(), "Available courses"),
            ("Enrollments", self.enrollments.len(), "Active enrollments"),
        ];
        for ((title, count, caption), tile) in counts.into_iter().zip(tiles.iter()) {
            let count = self.loaded.then_some(count);
            let paragraph = Paragraph::new(stat_lines(count, caption))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(title));
            frame.render_widget(paragraph, *tile);
        }

        let hints = vec![
            Line::from("2  Manage students: add, edit or remove students"),
            Line::from("3  Manage courses: add, edit or remove courses"),
            Line::from("4  Enrollments: enroll students in courses"),
        ];
        let quick = Paragraph::new(hints)
            .block(Block::default().borders(Borders::ALL).title("Quick Actions"))
            .wrap(Wrap { trim: true });
        frame.render_widget(quick, rows[1]);
    }

    fn draw_students(&self, frame: &mut Frame, area: Rect) {
        let items = self
            .students
            .iter()
            .map(|student| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("#{:<4} ", student.id),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(
                        student.name.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!("  <{}>", student.email)),
                    Span::styled(
                        format!(
                            "  {}  {}",
                            or_dash(student.phone.as_deref()),
                            or_dash(student.address.as_deref())
                        ),
                        Style::default().fg(Color::Gray),
                    ),
                ]))
            })
            .collect();
        self.draw_list(
            frame,
            area,
            "Students",
            items,
            self.student_selected,
            "No students yet. Press '+' to add one.",
        );
    }

    fn draw_courses(&self, frame: &mut Frame, area: Rect) {
        let items = self
            .courses
            .iter()
            .map(|course| {
                let credits = course
                    .credits
                    .map(|c| format!("{c} cr"))
                    .unwrap_or_else(|| "-".to_string());
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("#{:<4} ", course.id),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(
                        course.name.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!("  {credits}")),
                    Span::styled(
                        format!(
                            "  {}  {}",
                            or_dash(course.instructor.as_deref()),
                            or_dash(course.description.as_deref())
                        ),
                        Style::default().fg(Color::Gray),
                    ),
                ]))
            })
            .collect();
        self.draw_list(
            frame,
            area,
            "Courses",
            items,
            self.course_selected,
            "No courses yet. Press '+' to add one.",
        );
    }

    fn draw_enrollments(&self, frame: &mut Frame, area: Rect) {
        let items = self
            .enrollments
            .iter()
            .map(|detail| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("#{:<4} ", detail.enrollment.id),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(
                        detail.student.name.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(" → "),
                    Span::raw(detail.course.name.clone()),
                    Span::styled(
                        format!(
                            "  {}",
                            detail.enrollment.enrolled_at.format("%Y-%m-%d %H:%M")
                        ),
                        Style::default().fg(Color::Gray),
                    ),
                ]))
            })
            .collect();
        self.draw_list(
            frame,
            area,
            "Enrollments",
            items,
            self.enrollment_selected,
            "No enrollments yet. Press '+' to enroll a student.",
        );
    }

    fn draw_list(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        items: Vec<ListItem<'static>>,
        selected: usize,
        empty_message: &str,
    ) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{title} ({})", items.len()));

        if items.is_empty() {
            let message = Paragraph::new(empty_message.to_string())
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(message, area);
            return;
        }

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let text = match (&self.mode, self.screen) {
            (Mode::ConfirmDelete(_), _) => "Y confirm • N / Esc cancel",
            (Mode::AddingEnrollment(_), _) => {
                "←/→ choose • Tab switch field • Enter save • Esc cancel"
            }
            (Mode::Normal, Screen::Dashboard) => "1-4 / Tab switch screen • r refresh • q quit",
            (Mode::Normal, Screen::Students) => {
                "↑/↓ select • + add • e edit • - delete • m email • r refresh • Tab next • q quit"
            }
            (Mode::Normal, Screen::Courses) => {
                "↑/↓ select • + add • e edit • - delete • r refresh • Tab next • q quit"
            }
            (Mode::Normal, Screen::Enrollments) => {
                "↑/↓ select • + enroll • - delete • r refresh • Tab next • q quit"
            }
            _ => "Enter save • Tab / ↑↓ switch field • Esc cancel",
        };
        Line::from(Span::styled(text, Style::default().fg(Color::Gray)))
    }

    /// Shared popup frame for the forms: body lines, then either the error
    /// or a hint.
    fn draw_form_popup(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        mut lines: Vec<Line<'static>>,
        error: Option<&String>,
        hint: &'static str,
    ) -> Rect {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        lines.push(Line::from(""));
        match error {
            Some(error) => lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            ))),
            None => lines.push(Line::from(Span::styled(
                hint,
                Style::default().fg(Color::Gray),
            ))),
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
        inner
    }

    fn draw_student_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &StudentForm) {
        let inner = self.draw_form_popup(
            frame,
            area,
            title,
            form.lines(),
            form.error.as_ref(),
            "Enter to save • Tab to switch • Esc to cancel",
        );
        let (column, row) = form.cursor();
        frame.set_cursor_position((inner.x + column, inner.y + row));
    }

    fn draw_course_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &CourseForm) {
        let inner = self.draw_form_popup(
            frame,
            area,
            title,
            form.lines(),
            form.error.as_ref(),
            "Enter to save • Tab to switch • Credits 1-10 • Esc to cancel",
        );
        let (column, row) = form.cursor();
        frame.set_cursor_position((inner.x + column, inner.y + row));
    }

    fn draw_enrollment_form(&self, frame: &mut Frame, area: Rect, form: &EnrollmentForm) {
        self.draw_form_popup(
            frame,
            area,
            "Enroll Student",
            form.lines(&self.students, &self.courses),
            form.error.as_ref(),
            "←/→ to choose • Tab to switch • Enter to save • Esc to cancel",
        );
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Removal")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let noun = match confirm.target {
            DeleteTarget::Student => "student",
            DeleteTarget::Course => "course",
            DeleteTarget::Enrollment => "enrollment",
        };
        let lines = vec![
            Line::from(format!("Delete {noun} {}?", confirm.label)),
            Line::from(confirm.consequence()),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }
}

/// Pick the selection after a reload: the focused id if present, otherwise
/// the previous index clamped to the new length.
fn reselect(ids: impl Iterator<Item = i64>, focus_id: Option<i64>, previous: usize) -> usize {
    let ids: Vec<i64> = ids.collect();
    if ids.is_empty() {
        return 0;
    }
    if let Some(index) = focus_id.and_then(|id| ids.iter().position(|&candidate| candidate == id)) {
        return index;
    }
    previous.min(ids.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api;
    use crate::db::Store;

    fn app() -> (tokio::runtime::Runtime, App) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let client = ApiClient::new(
            api::router(Store::open_in_memory().unwrap()),
            runtime.handle().clone(),
        );
        (runtime, App::load(client))
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch));
        }
    }

    #[test]
    fn reselect_prefers_focus_then_clamps() {
        assert_eq!(reselect([5, 4, 3].into_iter(), Some(3), 0), 2);
        assert_eq!(reselect([5, 4].into_iter(), None, 7), 1);
        assert_eq!(reselect(std::iter::empty(), Some(1), 3), 0);
    }

    #[test]
    fn screens_cycle_with_tab() {
        assert_eq!(Screen::Dashboard.offset(-1), Screen::Enrollments);
        assert_eq!(Screen::Enrollments.offset(1), Screen::Dashboard);
    }

    #[test]
    fn adding_a_student_refetches_the_list() {
        let (_runtime, mut app) = app();
        app.handle_key(KeyCode::Char('2'));
        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "Ada");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "ada@example.com");
        app.handle_key(KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.students.len(), 1);
        assert_eq!(app.students[0].name, "Ada");
    }

    #[test]
    fn enrolling_and_deleting_the_student_clears_enrollments() {
        let (_runtime, mut app) = app();

        app.handle_key(KeyCode::Char('2'));
        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "Ada");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "ada@example.com");
        app.handle_key(KeyCode::Enter);

        app.handle_key(KeyCode::Char('3'));
        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "Algebra");
        app.handle_key(KeyCode::Enter);

        app.handle_key(KeyCode::Char('4'));
        app.handle_key(KeyCode::Char('+'));
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.enrollments.len(), 1);

        app.handle_key(KeyCode::Char('2'));
        app.handle_key(KeyCode::Char('-'));
        app.handle_key(KeyCode::Char('y'));
        assert!(app.students.is_empty());
        assert!(app.enrollments.is_empty());
    }

    #[test]
    fn duplicate_enrollment_keeps_form_open_with_error() {
        let (_runtime, mut app) = app();

        app.handle_key(KeyCode::Char('2'));
        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "Ada");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "ada@example.com");
        app.handle_key(KeyCode::Enter);

        app.handle_key(KeyCode::Char('3'));
        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "Algebra");
        app.handle_key(KeyCode::Enter);

        app.handle_key(KeyCode::Char('4'));
        for _ in 0..2 {
            app.handle_key(KeyCode::Char('+'));
            app.handle_key(KeyCode::Enter);
        }

        let Mode::AddingEnrollment(form) = &app.mode else {
            panic!("form should stay open");
        };
        assert_eq!(
            form.error.as_deref(),
            Some("Student already enrolled in this course")
        );
    }

    #[test]
    fn course_form_rejects_out_of_range_credits() {
        let (_runtime, mut app) = app();
        app.handle_key(KeyCode::Char('3'));
        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "Algebra");
        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "12");
        app.handle_key(KeyCode::Enter);

        assert!(matches!(app.mode, Mode::AddingCourse(_)));
        assert!(app.courses.is_empty());
    }
}
