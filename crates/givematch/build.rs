fn main() {
  shadow_rs::ShadowBuilder::builder().build().expect("could not generate build information");
}
