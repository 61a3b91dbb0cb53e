// Integration cases over the in-process service.

mod cases_forward_test;
