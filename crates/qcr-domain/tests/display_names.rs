use qcr_domain::disambiguate_display_name;

#[test]
fn unchanged_when_no_collision() {
  assert_eq!(disambiguate_display_name("b.cif", &["a.cif"]), "b.cif");
  let none: [&str; 0] = [];
  assert_eq!(disambiguate_display_name("a.cif", &none), "a.cif");
}

#[test]
fn picks_smallest_free_suffix() {
  assert_eq!(disambiguate_display_name("a.cif", &["a.cif", "a(2).cif"]), "a(3).cif");
  assert_eq!(disambiguate_display_name("a.cif", &["a.cif", "a(3).cif"]), "a(2).cif");
}

#[test]
fn only_last_dot_separates_extension() {
  assert_eq!(disambiguate_display_name("run.1.cif", &["run.1.cif"]), "run.1(2).cif");
}
